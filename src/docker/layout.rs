//! Fixed filesystem layout of the embedded Falcon sidecar

/// Stage alias given to the sidecar image
pub const FALCON_STAGE: &str = "falcon";

/// Stage alias of the intermediate staging image
pub const BUILD_STAGE: &str = "build";

/// Directory in the staging stage copied wholesale into the final image
pub const STAGING_ROOT: &str = "/build/tmp/";

/// Destination of the staging root in the final image
pub const FINAL_ROOT: &str = "/tmp/";

/// Read-only tree holding the agent's files inside the staging stage
pub const STAGING_ROOTFS: &str = "/build/tmp/CrowdStrike/rootfs";

/// Writable tree the agent uses for its own state
pub const STAGING_PRIVATE: &str = "/build/tmp/CrowdStrike-private/";

/// Environment variable the agent reads its CID options from
pub const CID_ENV_VAR: &str = "FALCONCTL_OPTS";

/// A path in the sidecar image and where it lands in the staging stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryMapping {
    pub source: &'static str,
    pub destination: &'static str,
}

impl DirectoryMapping {
    const fn new(source: &'static str, destination: &'static str) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Everything copied out of the sidecar image, in copy order
pub const DIRECTORY_MAPPINGS: [DirectoryMapping; 5] = [
    DirectoryMapping::new("/bin", "/build/tmp/CrowdStrike/rootfs/bin/"),
    DirectoryMapping::new("/etc", "/build/tmp/CrowdStrike/rootfs/etc/"),
    DirectoryMapping::new("/lib64", "/build/tmp/CrowdStrike/rootfs/lib64/"),
    DirectoryMapping::new("/usr", "/build/tmp/CrowdStrike/rootfs/usr/"),
    DirectoryMapping::new(
        "/entrypoint-ecs.sh",
        "/build/tmp/CrowdStrike/rootfs/entrypoint-ecs.sh",
    ),
];

/// Boots the agent through its own dynamic linker, then runs the bootstrap
/// script which execs into the image's original command
pub const WRAPPER_ENTRYPOINT: [&str; 5] = [
    "/tmp/CrowdStrike/rootfs/lib64/ld-linux-x86-64.so.2",
    "--library-path",
    "/tmp/CrowdStrike/rootfs/lib64",
    "/tmp/CrowdStrike/rootfs/bin/bash",
    "/tmp/CrowdStrike/rootfs/entrypoint-ecs.sh",
];

/// Shell command preparing the staging roots
pub fn staging_setup_command() -> String {
    let readonly_root = STAGING_ROOTFS
        .strip_suffix("/rootfs")
        .unwrap_or(STAGING_ROOTFS);
    let private_root = STAGING_PRIVATE.trim_end_matches('/');
    format!(
        "mkdir -p {STAGING_ROOTFS} && mkdir -p {STAGING_PRIVATE} && chmod -R a=rX {readonly_root} && chmod -R a=rwX {private_root}"
    )
}
