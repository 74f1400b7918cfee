mod trainer;

pub use trainer::{Trainer, train_model};
