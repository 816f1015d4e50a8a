//! The compression pipeline, one module per stage:
//!
//! 1. [`locate`]   — resolve the external tool (bundled tree, then PATH)
//! 2. [`args`]     — options → argument list + environment overlay
//! 3. [`exec`]     — spawn, capture merged output, map exit status
//! 4. [`assemble`] — rasterize only: page images → multi-page PDF

pub mod args;
pub mod assemble;
pub mod exec;
pub mod locate;
