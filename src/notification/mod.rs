pub mod controller;
pub mod dispatcher;
pub mod index;
pub mod model;
pub mod service;
pub mod store;
