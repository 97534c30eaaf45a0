//! I/O modules for imagery acquisition and parcel storage

pub mod imagery;
pub mod parcel;
pub mod synthetic;

pub use imagery::{ImageryClient, ImageryParams, SceneRecord};
pub use parcel::{parcel_from_geojson, parcel_to_feature, parcels_to_collection, ParcelStore};
pub use synthetic::SyntheticScene;
