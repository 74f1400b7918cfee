pub mod activations;
mod builder;
mod init;
pub mod layers;
pub mod loss;
mod model;
mod sequential;

pub use builder::{HIDDEN_SIZE, build_model};
pub use init::ParamGen;
pub use model::Model;
pub use sequential::Sequential;
