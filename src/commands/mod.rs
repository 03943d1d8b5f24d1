//! One clap command per pipeline stage

pub mod check;
pub mod filter;
pub mod grab;
pub mod match_exons;
pub mod prep;
pub mod rewrite;
pub mod select;
pub mod split;

pub use check::CheckCommand;
pub use filter::FilterCommand;
pub use grab::GrabCommand;
pub use match_exons::MatchCommand;
pub use prep::PrepCommand;
pub use rewrite::RewriteCommand;
pub use select::SelectCommand;
pub use split::SplitCommand;
