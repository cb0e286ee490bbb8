mod raster;
mod vector;

pub use raster::{
    clip_to_window, finalize, prepare, reproject, translate, LATLON_DATUM, PROJECTION,
    RASTER_STAGES,
};
pub use vector::{trails_name, VectorStatus, OSM_RGB_KEY, VECTOR_STAGES};
