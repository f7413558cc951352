//! Language-model collaborators: category routing, answer generation, relevance judging

mod generator;
mod judge;
mod router;

pub use generator::{extract_markers, AnswerGenerator, GeneratedAnswer};
pub use judge::RelevanceJudge;
pub use router::{CategoryDecision, CategoryRouter};

#[cfg(test)]
pub use generator::mock::MockAnswerGenerator;
#[cfg(test)]
pub use judge::mock::MockRelevanceJudge;
#[cfg(test)]
pub use router::mock::MockCategoryRouter;
