/*
 * Test Suite for the VPMU Driver
 *
 * Cross-module tests that drive the driver the way the host would: register
 * a set of devices, open them through their inodes, and read and write
 * through handles.
 *
 * ## Modules
 * - `scenarios`   - stream semantics, lifecycle and registration rollback
 * - `concurrency` - per-device serialisation, cancellation, cross-device use
 *
 * ## Fixtures
 * - `FakeHost`    - records every host call and can fail any of them
 * - `ProbeMapper` - hands out a caller-supplied window, optionally failing
 * - `ProbeWindow` - RAM window measuring how many accesses overlap
 */


use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use x86_64::PhysAddr;

use crate::io::chrdev::{CharDevHost, NodeMode};
use crate::io::device::{CdevId, DevNum, Errno};
use crate::io::window::{HwWindow, RamWindow, RegionMapper};

/// Errno every injected host failure reports
pub const INJECTED: Errno = Errno::EBUSY;

/// Host call as recorded by `FakeHost`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    RegionAlloc { major: u32, count: u32 },
    RegionFree { major: u32, count: u32 },
    ClassCreate(String),
    ClassDestroy(String),
    CdevAdd(DevNum),
    CdevDel(DevNum),
    NodeCreate(DevNum, String),
    NodeDestroy(DevNum),
}

#[derive(Default)]
struct HostState {
    events: Vec<HostEvent>,
    next_cdev: u64,
    bound: BTreeMap<u64, DevNum>,
    nodes: BTreeMap<DevNum, (String, Option<NodeMode>)>,
    region: Option<(u32, u32)>,
    class: Option<String>,
    fail_region: bool,
    fail_class: bool,
    fail_cdev_add_at: Option<u32>,
    fail_device_create_at: Option<u32>,
}

/// In-memory host character device layer
///
/// Clones share state, so a test can keep a handle after moving the host
/// into a registry.
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Arc<Mutex<HostState>>,
}

impl FakeHost {
    /// Major number every region is allocated under
    pub const MAJOR: u32 = 240;

    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, HostState> {
        self.state.lock().unwrap()
    }

    pub fn fail_region(&self) {
        self.state().fail_region = true;
    }

    pub fn fail_class(&self) {
        self.state().fail_class = true;
    }

    pub fn fail_cdev_add_at(&self, minor: Option<u32>) {
        self.state().fail_cdev_add_at = minor;
    }

    pub fn fail_device_create_at(&self, minor: Option<u32>) {
        self.state().fail_device_create_at = minor;
    }

    /// Minors currently bound
    pub fn bound(&self) -> usize {
        self.state().bound.len()
    }

    /// Nodes currently published
    pub fn nodes(&self) -> usize {
        self.state().nodes.len()
    }

    pub fn node_name(&self, devnum: DevNum) -> Option<String> {
        self.state().nodes.get(&devnum).map(|(name, _)| name.clone())
    }

    /// Mode a node was published with; outer `None` if it does not exist
    pub fn node_mode(&self, devnum: DevNum) -> Option<Option<NodeMode>> {
        self.state().nodes.get(&devnum).map(|(_, mode)| *mode)
    }

    pub fn region(&self) -> Option<(u32, u32)> {
        self.state().region
    }

    pub fn has_class(&self) -> bool {
        self.state().class.is_some()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.state().events.clone()
    }

    /// True once everything the driver acquired has been given back
    pub fn is_clean(&self) -> bool {
        let state = self.state();
        state.bound.is_empty()
            && state.nodes.is_empty()
            && state.region.is_none()
            && state.class.is_none()
    }
}

impl CharDevHost for FakeHost {
    fn alloc_chrdev_region(&mut self, count: u32, _name: &str) -> Result<u32, Errno> {
        let mut state = self.state();
        if state.fail_region {
            return Err(INJECTED);
        }
        state.region = Some((Self::MAJOR, count));
        state.events.push(HostEvent::RegionAlloc { major: Self::MAJOR, count });
        Ok(Self::MAJOR)
    }

    fn unregister_chrdev_region(&mut self, major: u32, count: u32) {
        let mut state = self.state();
        assert_eq!(state.region.take(), Some((major, count)), "freeing a region never allocated");
        state.events.push(HostEvent::RegionFree { major, count });
    }

    fn class_create(&mut self, name: &str) -> Result<(), Errno> {
        let mut state = self.state();
        if state.fail_class {
            return Err(INJECTED);
        }
        state.class = Some(name.to_string());
        state.events.push(HostEvent::ClassCreate(name.to_string()));
        Ok(())
    }

    fn class_destroy(&mut self, name: &str) {
        let mut state = self.state();
        assert_eq!(state.class.take().as_deref(), Some(name), "destroying a class never created");
        state.events.push(HostEvent::ClassDestroy(name.to_string()));
    }

    fn cdev_add(&mut self, devnum: DevNum) -> Result<CdevId, Errno> {
        let mut state = self.state();
        if state.fail_cdev_add_at == Some(devnum.minor) {
            return Err(INJECTED);
        }
        state.next_cdev += 1;
        let id = state.next_cdev;
        state.bound.insert(id, devnum);
        state.events.push(HostEvent::CdevAdd(devnum));
        Ok(CdevId(id))
    }

    fn cdev_del(&mut self, cdev: CdevId) {
        let mut state = self.state();
        let devnum = state.bound.remove(&cdev.0).expect("cdev deleted twice");
        state.events.push(HostEvent::CdevDel(devnum));
    }

    fn device_create(
        &mut self,
        devnum: DevNum,
        name: &str,
        mode: Option<NodeMode>,
    ) -> Result<(), Errno> {
        let mut state = self.state();
        if state.fail_device_create_at == Some(devnum.minor) {
            return Err(INJECTED);
        }
        assert!(state.class.is_some() || state.region.is_none(), "node created outside a class");
        state.nodes.insert(devnum, (name.to_string(), mode));
        state.events.push(HostEvent::NodeCreate(devnum, name.to_string()));
        Ok(())
    }

    fn device_destroy(&mut self, devnum: DevNum) {
        let mut state = self.state();
        state.nodes.remove(&devnum).expect("node destroyed twice");
        state.events.push(HostEvent::NodeDestroy(devnum));
    }
}

/// Mapper returning one fixed window
pub struct ProbeMapper {
    window: Arc<dyn HwWindow>,
    fail: bool,
    unmapped: Arc<AtomicUsize>,
}

impl ProbeMapper {
    pub fn new(window: Arc<dyn HwWindow>) -> Self {
        Self {
            window,
            fail: false,
            unmapped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Mapper whose every `ioremap` fails with ENOMEM
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Arc::new(RamWindow::new(0)))
        }
    }

    /// Counter of `iounmap` calls, shared with the mapper
    pub fn unmap_counter(&self) -> Arc<AtomicUsize> {
        self.unmapped.clone()
    }
}

impl RegionMapper for ProbeMapper {
    fn ioremap(&mut self, _base: PhysAddr, size: usize) -> Result<Arc<dyn HwWindow>, Errno> {
        if self.fail {
            return Err(Errno::ENOMEM);
        }
        assert!(self.window.len() >= size, "window smaller than requested mapping");
        Ok(self.window.clone())
    }

    fn iounmap(&mut self, _window: Arc<dyn HwWindow>) {
        self.unmapped.fetch_add(1, Ordering::SeqCst);
    }
}

/// RAM window that records how many word accesses were in flight at once
pub struct ProbeWindow {
    inner: RamWindow,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ProbeWindow {
    pub fn new(len: usize) -> Self {
        Self {
            inner: RamWindow::new(len),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Highest number of simultaneous accesses seen
    pub fn max_overlap(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Widen the access so overlapping callers would be caught.
        thread::yield_now();
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl HwWindow for ProbeWindow {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn read_word(&self, index: usize) -> usize {
        self.enter();
        let value = self.inner.read_word(index);
        self.exit();
        value
    }

    fn write_word(&self, index: usize, value: usize) {
        self.enter();
        self.inner.write_word(index, value);
        self.exit();
    }
}
