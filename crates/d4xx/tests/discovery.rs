// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors
//
// D4XX Topology Discovery Tests
//
// TESTING LAYERS:
//
// Layer 1 (No hardware required):
//   - Role-link grouping over synthetic `video-rs-{role}-{index}` trees
//   - Absent roles, missing depth links, ordering by base index
//   - Discovery cache invalidate/refresh
//   - Capability scan ignoring non-V4L2 nodes
//
// Layer 3 (Hardware Integration - Requires a D4XX camera):
//   - see tests/hardware.rs
//
// RUN LAYER 1:
//   cargo test --test discovery

use std::fs::{self, File};
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use d4xx::discovery::{discover_by_capability, discover_role_links, Discovery, Role, ROLE_COUNT};
use rand::Rng;

/// A throwaway device directory with fake `videoN` nodes and role links.
struct FakeDev {
    root: PathBuf,
}

impl FakeDev {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let root = std::env::temp_dir().join(format!(
            "d4xx-discovery-{}-{}",
            std::process::id(),
            rand::rng().random::<u64>()
        ));
        fs::create_dir_all(&root).unwrap();
        FakeDev { root }
    }

    fn path(&self) -> &Path {
        &self.root
    }

    /// Creates `videoN` as a regular file and returns its canonical path.
    fn node(&self, n: u32) -> PathBuf {
        let path = self.root.join(format!("video{}", n));
        File::create(&path).unwrap();
        fs::canonicalize(path).unwrap()
    }

    /// Links `video-rs-{role}-{cam}` to `videoN`.
    fn link(&self, role: Role, cam: u32, n: u32) -> PathBuf {
        let target = self.node(n);
        symlink(
            &target,
            self.root
                .join(format!("video-rs-{}-{}", role.link_name(), cam)),
        )
        .unwrap();
        target
    }
}

impl Drop for FakeDev {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

// =============================================================================
// Layer 1: Role links
// =============================================================================

#[test]
fn test_depth_only_camera() {
    let dev = FakeDev::new();
    let depth = dev.link(Role::Depth, 0, 0);

    let cameras = discover_role_links(dev.path());
    assert_eq!(cameras.len(), 1);

    let camera = &cameras[0];
    assert_eq!(camera.base_index, 0);
    assert_eq!(camera.path(Role::Depth), depth.as_path());
    for role in Role::ALL.into_iter().filter(|r| *r != Role::Depth) {
        assert!(!camera.has_role(role), "{} should be absent", role);
        assert_eq!(camera.path(role), Path::new(""));
    }
    // the fake node is not a V4L2 device, so probing finds nothing
    assert!(camera.driver.is_empty());
    assert!(camera.fw_version.is_none());
}

#[test]
fn test_two_cameras_ordered_by_base_index() {
    let dev = FakeDev::new();
    dev.link(Role::Depth, 2, 2);
    dev.link(Role::Depth, 0, 0);

    let cameras = discover_role_links(dev.path());
    let bases: Vec<u32> = cameras.iter().map(|c| c.base_index).collect();
    assert_eq!(bases, vec![0, 2]);
    for camera in &cameras {
        assert_eq!(camera.devices.len(), ROLE_COUNT);
    }
}

#[test]
fn test_full_camera_slots() {
    let dev = FakeDev::new();
    let mut expected = Vec::new();
    for (n, role) in Role::ALL.into_iter().enumerate() {
        expected.push(dev.link(role, 0, n as u32));
    }

    let cameras = discover_role_links(dev.path());
    assert_eq!(cameras.len(), 1);
    for (role, target) in Role::ALL.into_iter().zip(&expected) {
        assert_eq!(cameras[0].path(role), target.as_path());
    }
    assert_eq!(cameras[0].roles().count(), ROLE_COUNT);
}

#[test]
fn test_camera_without_depth_is_skipped() {
    let dev = FakeDev::new();
    dev.link(Role::Color, 0, 2);
    dev.link(Role::Infrared, 0, 4);
    dev.link(Role::Depth, 1, 6);

    let cameras = discover_role_links(dev.path());
    assert_eq!(cameras.len(), 1);
    assert_eq!(cameras[0].base_index, 6);
}

#[test]
fn test_unrelated_entries_are_ignored() {
    let dev = FakeDev::new();
    dev.node(9);
    File::create(dev.path().join("video-rs-lidar-0")).unwrap();
    File::create(dev.path().join("media0")).unwrap();

    assert!(discover_role_links(dev.path()).is_empty());
}

#[test]
fn test_base_index_falls_back_to_camera_index() {
    let dev = FakeDev::new();
    let target = dev.path().join("d4xx-depth");
    File::create(&target).unwrap();
    symlink(&target, dev.path().join("video-rs-depth-3")).unwrap();

    let cameras = discover_role_links(dev.path());
    assert_eq!(cameras.len(), 1);
    assert_eq!(cameras[0].base_index, 3);
}

// =============================================================================
// Layer 1: Capability scan and cache
// =============================================================================

#[test]
fn test_capability_scan_skips_non_v4l2_nodes() {
    let dev = FakeDev::new();
    for n in 0..ROLE_COUNT as u32 {
        dev.node(n);
    }
    assert!(discover_by_capability(dev.path()).is_empty());
}

#[test]
fn test_discovery_cache_and_refresh() {
    let dev = FakeDev::new();
    dev.link(Role::Depth, 0, 0);

    let mut discovery = Discovery::with_root(dev.path());
    assert_eq!(discovery.root(), dev.path());
    assert_eq!(discovery.cameras().len(), 1);

    dev.link(Role::Depth, 1, 6);
    // still the cached result
    assert_eq!(discovery.cameras().len(), 1);

    assert_eq!(discovery.refresh().len(), 2);

    discovery.invalidate();
    assert_eq!(discovery.cameras().len(), 2);
}

#[test]
fn test_empty_tree_is_empty_list() {
    let dev = FakeDev::new();
    let mut discovery = Discovery::with_root(dev.path());
    assert!(discovery.cameras().is_empty());
}
