pub mod f32;
pub mod io;
pub mod nifti;
pub mod traits;
pub mod vector;

pub use self::f32::ImageF32;
pub use self::traits::{ImageView, Rows};
pub use self::vector::{ComponentValue, SharedBuffer, VectorImage, VectorLayout};
