pub mod division;
pub mod draw;
pub mod layers;
pub mod map;
pub mod map_tile;
pub mod measure;
pub mod projection;
pub mod view;
