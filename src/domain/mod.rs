mod integrity;
mod movement;
mod price;
mod product;
mod snapshot;

pub use integrity::*;
pub use movement::*;
pub use price::*;
pub use product::*;
pub use snapshot::*;
