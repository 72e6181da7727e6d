//! `info`: inspect the installation and the cluster it points at.

pub mod cache;
pub mod collect;
pub mod doctor;
pub mod master;
pub mod nodes;
pub mod report;
pub mod version;

use crate::cli::{RegistryError, Service};

pub const NAME: &str = "info";

pub fn service() -> Result<Service, RegistryError> {
    Service::builder(
        NAME,
        "Retrieve and/or display info about the running Alluxio cluster",
    )
    .command(cache::Cache)
    .command(collect::Collect)
    .command(doctor::Doctor)
    .command(master::Master)
    .command(nodes::Nodes)
    .command(report::Report)
    .command(version::Version)
    .build()
}
