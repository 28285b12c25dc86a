pub mod folder_watch;
pub mod green_pixels;
pub mod metric;
pub mod pixel_buffer;
pub mod processor;
pub mod region;
pub mod source;
