// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

//! D4XX camera topology discovery
//!
//! One D4XX camera exposes up to six V4L2 nodes, one per [`Role`]. Discovery
//! groups the nodes under a device directory (normally `/dev`) into
//! [`Camera`] records. Two strategies are tried in order, and the first one
//! that finds anything wins:
//!
//! 1. **Role links** ([`discover_role_links`]): udev rules on Tegra platforms
//!    create `video-rs-{role}-{index}` links. Links are grouped by camera
//!    index and a group needs at least its depth link. Missing roles are left
//!    empty; the camera is kept.
//! 2. **Capability scan** ([`discover_by_capability`]): every `videoN` node is
//!    opened in ascending `N` order and kept when its driver is `d4xx`. The
//!    kept nodes are cut into consecutive groups of six; an incomplete
//!    trailing group is dropped.
//!
//! Both strategies query the depth node for identity and the firmware
//! version. Failures there leave those fields empty and never fail discovery.
//!
//! Results are cached by [`Discovery`] until [`Discovery::refresh`] or
//! [`Discovery::invalidate`] is called.
//!
//! # Example
//!
//! ```no_run
//! use d4xx::discovery::{Discovery, Role};
//!
//! let mut discovery = Discovery::new();
//! for camera in discovery.cameras() {
//!     println!("camera {} depth={}", camera.base_index, camera.path(Role::Depth).display());
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::controls::FirmwareVersion;
use crate::device::{Capability, DeviceHandle};

/// Prefix of the role links created by the D4XX udev rules.
pub const ROLE_LINK_PREFIX: &str = "video-rs-";

/// Driver name reported by D4XX nodes, used by the capability scan.
pub const D4XX_DRIVER_NAME: &str = "d4xx";

/// Driver names seen on D4XX cameras (`tegra-video` when the nodes are
/// owned by the Tegra VI capture driver).
pub const KNOWN_DRIVER_NAMES: [&str; 2] = [D4XX_DRIVER_NAME, "tegra-video"];

/// Number of nodes (roles) per camera.
pub const ROLE_COUNT: usize = 6;

/// Stream role of a node within a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Depth,
    DepthMetadata,
    Color,
    ColorMetadata,
    Infrared,
    Inertial,
}

impl Role {
    /// All roles in slot order.
    pub const ALL: [Role; ROLE_COUNT] = [
        Role::Depth,
        Role::DepthMetadata,
        Role::Color,
        Role::ColorMetadata,
        Role::Infrared,
        Role::Inertial,
    ];

    /// Slot of this role in [`Camera::devices`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Role name as used in `video-rs-{role}-{index}` links.
    pub const fn link_name(self) -> &'static str {
        match self {
            Role::Depth => "depth",
            Role::DepthMetadata => "depth-md",
            Role::Color => "color",
            Role::ColorMetadata => "color-md",
            Role::Infrared => "ir",
            Role::Inertial => "imu",
        }
    }

    pub fn from_link_name(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.link_name() == name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.link_name())
    }
}

/// One discovered camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camera {
    /// Index `N` of the depth node `videoN`
    pub base_index: u32,
    /// Node path per role, indexed by [`Role::index`]; empty when absent
    pub devices: [PathBuf; ROLE_COUNT],
    pub driver: String,
    pub card: String,
    pub bus_info: String,
    pub fw_version: Option<FirmwareVersion>,
}

impl Camera {
    fn new(base_index: u32, devices: [PathBuf; ROLE_COUNT]) -> Self {
        Camera {
            base_index,
            devices,
            driver: String::new(),
            card: String::new(),
            bus_info: String::new(),
            fw_version: None,
        }
    }

    /// Node path for `role`. Absent roles yield an empty path.
    pub fn path(&self, role: Role) -> &Path {
        &self.devices[role.index()]
    }

    pub fn has_role(&self, role: Role) -> bool {
        !self.path(role).as_os_str().is_empty()
    }

    /// Roles that have a node, in slot order.
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|role| self.has_role(*role))
    }

    pub fn is_known_driver(&self) -> bool {
        KNOWN_DRIVER_NAMES.contains(&self.driver.as_str())
    }

    fn apply_capability(&mut self, cap: &Capability) {
        self.driver = cap.driver.clone();
        self.card = cap.card.clone();
        self.bus_info = cap.bus_info.clone();
    }

    /// Opens the depth node once for identity and firmware version.
    fn identify(&mut self) {
        let depth = self.path(Role::Depth).to_path_buf();
        let dev = match DeviceHandle::open(&depth) {
            Ok(dev) => dev,
            Err(err) => {
                debug!("identity query of {} skipped: {}", depth.display(), err);
                return;
            }
        };
        if self.driver.is_empty() {
            match dev.query_capability() {
                Ok(cap) => self.apply_capability(&cap),
                Err(err) => debug!("{}: no capability: {}", depth.display(), err),
            }
        }
        match dev.firmware_version() {
            Ok(fw) => self.fw_version = Some(fw),
            Err(err) => debug!("{}: no firmware version: {}", depth.display(), err),
        }
    }
}

impl fmt::Display for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "camera {} ({}", self.base_index, self.card)?;
        if let Some(fw) = &self.fw_version {
            write!(f, ", FW {}", fw)?;
        }
        write!(f, ") depth={}", self.path(Role::Depth).display())
    }
}

/// Splits `video-rs-{role}-{index}` into its role and camera index.
pub fn parse_role_link(name: &str) -> Option<(Role, u32)> {
    let rest = name.strip_prefix(ROLE_LINK_PREFIX)?;
    let (role, index) = rest.rsplit_once('-')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((Role::from_link_name(role)?, index.parse().ok()?))
}

/// `N` for a path whose file name is exactly `videoN`.
pub fn video_index(path: &Path) -> Option<u32> {
    let digits = path.file_name()?.to_str()?.strip_prefix("video")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn list_dir(root: &Path) -> Vec<PathBuf> {
    match fs::read_dir(root) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(err) => {
            debug!("cannot list {}: {}", root.display(), err);
            Vec::new()
        }
    }
}

/// Strategy 1: group `video-rs-{role}-{index}` links under `root`.
pub fn discover_role_links(root: &Path) -> Vec<Camera> {
    let mut groups: BTreeMap<u32, [Option<PathBuf>; ROLE_COUNT]> = BTreeMap::new();
    for link in list_dir(root) {
        let Some((role, cam_index)) = link
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_role_link)
        else {
            continue;
        };
        let target = fs::canonicalize(&link).unwrap_or_else(|err| {
            debug!("cannot resolve {}: {}", link.display(), err);
            link.clone()
        });
        groups.entry(cam_index).or_default()[role.index()] = Some(target);
    }

    let mut cameras = Vec::new();
    for (cam_index, slots) in groups {
        if slots[Role::Depth.index()].is_none() {
            debug!("role links for camera {} have no depth node, skipped", cam_index);
            continue;
        }
        let devices = slots.map(Option::unwrap_or_default);
        let base_index = video_index(&devices[Role::Depth.index()]).unwrap_or(cam_index);
        let mut camera = Camera::new(base_index, devices);
        camera.identify();
        cameras.push(camera);
    }
    cameras.sort_by_key(|c| c.base_index);
    cameras
}

/// Strategy 2: group `d4xx` driver nodes under `root` six at a time.
pub fn discover_by_capability(root: &Path) -> Vec<Camera> {
    let mut nodes: Vec<(u32, PathBuf)> = list_dir(root)
        .into_iter()
        .filter_map(|path| video_index(&path).map(|n| (n, path)))
        .collect();
    nodes.sort_by_key(|(n, _)| *n);

    let mut matched: Vec<(u32, PathBuf, Capability)> = Vec::new();
    for (index, path) in nodes {
        let cap = match DeviceHandle::open(&path).and_then(|dev| dev.query_capability()) {
            Ok(cap) => cap,
            Err(err) => {
                debug!("{}: skipped: {}", path.display(), err);
                continue;
            }
        };
        if cap.driver == D4XX_DRIVER_NAME {
            matched.push((index, path, cap));
        }
    }

    let mut cameras = Vec::new();
    for group in matched.chunks_exact(ROLE_COUNT) {
        let devices: [PathBuf; ROLE_COUNT] = std::array::from_fn(|i| group[i].1.clone());
        let mut camera = Camera::new(group[0].0, devices);
        camera.apply_capability(&group[0].2);
        camera.identify();
        cameras.push(camera);
    }
    let leftover = matched.len() % ROLE_COUNT;
    if leftover != 0 {
        debug!("{} trailing d4xx nodes do not form a camera", leftover);
    }
    cameras
}

/// Discovery over a device directory, with cached results.
#[derive(Debug, Clone)]
pub struct Discovery {
    root: PathBuf,
    cache: Option<Vec<Camera>>,
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Discovery {
    /// Discovery over `/dev`.
    pub fn new() -> Self {
        Self::with_root("/dev")
    }

    /// Discovery over another directory (a test tree or a chroot's `/dev`).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Discovery {
            root: root.into(),
            cache: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cached cameras, scanning on first use.
    pub fn cameras(&mut self) -> &[Camera] {
        if self.cache.is_none() {
            self.cache = Some(self.scan());
        }
        self.cache.as_deref().unwrap_or_default()
    }

    /// Rescans and replaces the cache.
    pub fn refresh(&mut self) -> &[Camera] {
        self.invalidate();
        self.cameras()
    }

    /// Drops the cache; the next [`cameras`](Self::cameras) call rescans.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    fn scan(&self) -> Vec<Camera> {
        let mut cameras = discover_role_links(&self.root);
        let strategy = if cameras.is_empty() {
            cameras = discover_by_capability(&self.root);
            "capability scan"
        } else {
            "role links"
        };
        info!(
            "found {} D4XX camera(s) under {} via {}",
            cameras.len(),
            self.root.display(),
            strategy
        );
        cameras
    }
}

/// Discovers cameras under `/dev` without caching.
pub fn discover() -> Vec<Camera> {
    Discovery::new().scan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_link_names() {
        for role in Role::ALL {
            assert_eq!(Role::from_link_name(role.link_name()), Some(role));
        }
        assert_eq!(Role::from_link_name("rgb"), None);
        assert_eq!(Role::Inertial.index(), 5);
    }

    #[test]
    fn test_parse_role_link() {
        assert_eq!(parse_role_link("video-rs-depth-0"), Some((Role::Depth, 0)));
        assert_eq!(
            parse_role_link("video-rs-depth-md-12"),
            Some((Role::DepthMetadata, 12))
        );
        assert_eq!(parse_role_link("video-rs-color-md-1"), Some((Role::ColorMetadata, 1)));
        assert_eq!(parse_role_link("video-rs-imu-3"), Some((Role::Inertial, 3)));
        assert_eq!(parse_role_link("video-rs-depth"), None);
        assert_eq!(parse_role_link("video-rs-depth-x"), None);
        assert_eq!(parse_role_link("video-rs-lidar-0"), None);
        assert_eq!(parse_role_link("video0"), None);
    }

    #[test]
    fn test_video_index() {
        assert_eq!(video_index(Path::new("/dev/video0")), Some(0));
        assert_eq!(video_index(Path::new("/dev/video17")), Some(17));
        assert_eq!(video_index(Path::new("/dev/video-rs-depth-0")), None);
        assert_eq!(video_index(Path::new("/dev/video")), None);
        assert_eq!(video_index(Path::new("")), None);
    }

    #[test]
    fn test_absent_role_is_empty_path() {
        let mut devices: [PathBuf; ROLE_COUNT] = Default::default();
        devices[Role::Depth.index()] = PathBuf::from("/dev/video0");
        let camera = Camera::new(0, devices);
        assert!(camera.has_role(Role::Depth));
        assert!(!camera.has_role(Role::Color));
        assert_eq!(camera.path(Role::Inertial), Path::new(""));
        assert_eq!(camera.roles().collect::<Vec<_>>(), vec![Role::Depth]);
    }

    #[test]
    fn test_known_drivers() {
        let mut camera = Camera::new(0, Default::default());
        camera.driver = "tegra-video".into();
        assert!(camera.is_known_driver());
        camera.driver = "uvcvideo".into();
        assert!(!camera.is_known_driver());
    }

    #[test]
    fn test_missing_root_is_empty() {
        let mut discovery = Discovery::with_root("/nonexistent/d4xx-root");
        assert!(discovery.cameras().is_empty());
        assert!(discover_by_capability(Path::new("/nonexistent/d4xx-root")).is_empty());
    }
}
