pub mod classifier;
pub mod compactor;
pub mod item;
pub mod scanner;
pub mod serializer;
pub mod uia;
