//! Resource caching and work scheduling for Vulkan renderers
//!
//! Deimos sits underneath the render passes of a real-time renderer. It deduplicates descriptor set layouts and
//! framebuffers by their structure, hands out descriptor sets from pools that are recycled once per frame in flight,
//! and runs independent command recording work on a fixed thread pool with a fork/join primitive.
//!
//! To get started, the easiest way is to simply
//! ```
//! // Import all important traits
//! use deimos::prelude::traits;
//! // Import types under a namespace.
//! use deimos::prelude as dm;
//!
//! // Or, if you dont care about using the types under a namespace
//! use deimos::prelude::*;
//! ```
//!
//! # Example
//!
//! Deimos does not create the Vulkan device itself. Wrap the `ash::Device` created by your windowing layer and
//! build a [`RendererContext`] from it.
//! ```ignore
//! use deimos::prelude::*;
//!
//! let settings = ContextBuilder::new()
//!     .frames_in_flight(2)
//!     .worker_threads(4)
//!     .build();
//! let mut ctx = RendererContext::new(Device::new(ash_device), &settings)?;
//! ```
//! For further example code, check out the following modules
//! - [`descriptor`] for descriptor set layouts, descriptor pools and building descriptor sets.
//! - [`framebuffer`] for framebuffer caching and invalidation.
//! - [`sync`] for the task scheduler.
//! - [`context`] for the renderer context tying everything together.

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub mod context;
pub mod core;
pub mod descriptor;
pub mod framebuffer;
pub mod sync;
pub mod util;
