pub mod registry;

pub use registry::DoctorRegistry;
