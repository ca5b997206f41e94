pub mod residency;
