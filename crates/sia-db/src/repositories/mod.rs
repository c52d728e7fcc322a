pub mod service_repo;
