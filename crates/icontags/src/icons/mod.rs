//! Icons: the registry of named icons and their decoded images.

mod icon_image;
mod registry;

pub use icon_image::IconImage;
pub use registry::{
    FILE_ICON, FILE_TAGS_ICON, FOLDER_ICON, FOLDER_TAGS_ICON, ICON_EXTENSION, IconHandle,
    IconRegistry, NO_IMAGE, RESERVED_NAMES, SEVERAL_ICONS, StockIcon, is_reserved,
};
