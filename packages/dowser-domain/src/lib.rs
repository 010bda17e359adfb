pub mod compose;
pub mod fusion;
pub mod grounding;
pub mod links;
pub mod quota;
pub mod similarity;
pub mod text;
