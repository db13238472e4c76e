//! Thread-safety bound shared by every host trait.
//!
//! Session hosts are held as `Arc<dyn Trait>` and called from spawned decode
//! and publisher tasks, so native builds need `Send + Sync`. A `wasm32` host
//! lives on the browser's single thread and its JS handles satisfy neither,
//! so there the bound is empty.

/// `Send + Sync` everywhere except `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> PlatformSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSendSync {}

#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> PlatformSendSync for T {}
