pub mod prove;
pub mod read_circuit;

pub use prove::{prove, ProveArgs, ProveOutput};
pub use read_circuit::{read_circuit, ReadCircuitArgs};
