mod broadcast;
mod filter;
mod function;
mod generator;
mod overwrite;
mod queue;
mod source;

pub use broadcast::BroadcastNode;
pub use filter::FilterNode;
pub use function::FunctionNode;
pub use generator::GeneratorNode;
pub use overwrite::OverwriteNode;
pub use queue::QueueNode;
pub use source::SourceNode;
