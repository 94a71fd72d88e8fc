//! Definition DSL
//!
//! Graph definitions are assembled from small transforms and handed to a
//! builder:
//!
//! ```
//! use signal_graph_core::dsl::{add_dependency, add_derived, add_primary, SignalGraphBuilder};
//! use signal_graph_core::graph::{Dependency, Upstreams};
//!
//! let builder = SignalGraphBuilder::<i64>::new()
//!     .define([
//!         add_primary("price"),
//!         add_dependency("quantity", Dependency::value(3)),
//!         add_derived(
//!             "total",
//!             |up: &Upstreams<'_, i64>| {
//!                 let quantity = *up.value(1)?;
//!                 Ok(up.stream(0)?.map(move |price: i64| price * quantity))
//!             },
//!             ["price", "quantity"],
//!         ),
//!     ])
//!     .initialize_with([("price", 10)]);
//!
//! let graph = builder.build().unwrap();
//! let _sub = graph.output("total").unwrap().subscribe(|total| println!("total: {total}"));
//! ```

mod builder;
mod transform;

pub use builder::SignalGraphBuilder;
pub use transform::{add_dependency, add_derived, add_primary, Transform};
