//! Database repositories for the movie catalog
//!
//! [`MovieStore`] is the seam the API depends on; [`MovieRepository`] implements it on
//! PostgreSQL and [`InMemoryMovieStore`] keeps records in process memory.

pub mod db;

pub use db::{InMemoryMovieStore, MovieRepository, MovieStore, StoreDetails};
