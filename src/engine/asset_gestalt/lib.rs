mod name;
pub use name::*;

mod resource_urn;
pub use resource_urn::*;

mod asset_error;
pub use asset_error::*;

mod asset;
pub use asset::*;

mod asset_handle;
pub use asset_handle::*;

mod asset_type;
pub use asset_type::*;

mod asset_delta;
pub use asset_delta::*;

mod fragment_producer;
pub use fragment_producer::*;

mod asset_manager;
pub use asset_manager::*;

pub mod utils;
