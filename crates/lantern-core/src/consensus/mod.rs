pub mod bls;
pub mod compare;
pub mod fork;
pub mod light_client;
pub mod store;
pub mod verify;

pub use bls::*;
pub use compare::*;
pub use fork::*;
pub use light_client::*;
pub use store::*;
pub use verify::*;
