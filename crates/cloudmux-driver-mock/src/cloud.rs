//! In-memory cloud backing the mock driver
//!
//! One [`MockCloud`] exists per `MockName` credential value, so separate
//! connections with the same name see the same resources. Every handler
//! operation is counted, can be delayed and can be made to fail once.

use cloudmux_driver::resources::{
    ClusterInfo, DiskInfo, KeyPairInfo, MyImageInfo, NlbInfo, SecurityInfo, VmInfo, VmStatus,
    VpcInfo,
};
use cloudmux_driver::{DriverError, HasIid, Iid, KeyValue, ResourceKind, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::time::Duration;

static CLOUDS: LazyLock<Mutex<HashMap<String, Arc<MockCloud>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Rows of one resource kind, keyed by SystemId
#[derive(Debug)]
pub(crate) struct Table<T> {
    kind: ResourceKind,
    rows: BTreeMap<String, T>,
}

impl<T: HasIid + Clone> Table<T> {
    fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            rows: BTreeMap::new(),
        }
    }

    fn key_of(&self, iid: &Iid) -> Option<String> {
        if !iid.system_id.is_empty() {
            return self.rows.contains_key(&iid.system_id).then(|| iid.system_id.clone());
        }
        self.rows
            .iter()
            .find(|(_, row)| row.iid().name_id == iid.name_id)
            .map(|(k, _)| k.clone())
    }

    fn not_found(&self, iid: &Iid) -> DriverError {
        DriverError::not_found(format!("{} {}", self.kind, iid))
    }

    pub fn name_taken(&self, name: &str) -> bool {
        self.rows.values().any(|row| row.iid().name_id == name)
    }

    pub fn insert(&mut self, row: T) {
        self.rows.insert(row.iid().system_id.clone(), row);
    }

    pub fn get(&self, iid: &Iid) -> Result<T> {
        self.key_of(iid)
            .and_then(|k| self.rows.get(&k).cloned())
            .ok_or_else(|| self.not_found(iid))
    }

    pub fn get_mut(&mut self, iid: &Iid) -> Result<&mut T> {
        let err = self.not_found(iid);
        match self.key_of(iid) {
            Some(k) => self.rows.get_mut(&k).ok_or(err),
            None => Err(err),
        }
    }

    pub fn remove(&mut self, iid: &Iid) -> Result<T> {
        let err = self.not_found(iid);
        match self.key_of(iid) {
            Some(k) => self.rows.remove(&k).ok_or(err),
            None => Err(err),
        }
    }

    pub fn list(&self) -> Vec<T> {
        self.rows.values().cloned().collect()
    }

    pub fn list_iid(&self) -> Vec<Iid> {
        self.rows.values().map(|row| row.iid().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug)]
pub(crate) struct CloudState {
    pub vpcs: Table<VpcInfo>,
    pub security_groups: Table<SecurityInfo>,
    pub key_pairs: Table<KeyPairInfo>,
    pub vms: Table<VmInfo>,
    pub vm_status: HashMap<String, VmStatus>,
    pub disks: Table<DiskInfo>,
    pub nlbs: Table<NlbInfo>,
    pub clusters: Table<ClusterInfo>,
    pub my_images: Table<MyImageInfo>,
}

impl CloudState {
    /// Tag list of one resource
    pub fn tags_mut(&mut self, kind: ResourceKind, iid: &Iid) -> Result<&mut Vec<KeyValue>> {
        Ok(match kind {
            ResourceKind::Vpc => &mut self.vpcs.get_mut(iid)?.tag_list,
            ResourceKind::SecurityGroup => &mut self.security_groups.get_mut(iid)?.tag_list,
            ResourceKind::KeyPair => &mut self.key_pairs.get_mut(iid)?.tag_list,
            ResourceKind::Vm => &mut self.vms.get_mut(iid)?.tag_list,
            ResourceKind::Disk => &mut self.disks.get_mut(iid)?.tag_list,
            ResourceKind::Nlb => &mut self.nlbs.get_mut(iid)?.tag_list,
            ResourceKind::Cluster => &mut self.clusters.get_mut(iid)?.tag_list,
            ResourceKind::MyImage => &mut self.my_images.get_mut(iid)?.tag_list,
            ResourceKind::Image | ResourceKind::Subnet | ResourceKind::NodeGroup => {
                return Err(DriverError::unsupported(format!("tags on {}", kind)));
            }
        })
    }

    /// IID and tags of every resource of `kind`
    pub fn tagged(&self, kind: ResourceKind) -> Result<Vec<(Iid, Vec<KeyValue>)>> {
        fn rows<T: HasIid + Clone>(table: &Table<T>, tags: impl Fn(&T) -> &Vec<KeyValue>) -> Vec<(Iid, Vec<KeyValue>)> {
            table
                .rows
                .values()
                .map(|row| (row.iid().clone(), tags(row).clone()))
                .collect()
        }
        Ok(match kind {
            ResourceKind::Vpc => rows(&self.vpcs, |r| &r.tag_list),
            ResourceKind::SecurityGroup => rows(&self.security_groups, |r| &r.tag_list),
            ResourceKind::KeyPair => rows(&self.key_pairs, |r| &r.tag_list),
            ResourceKind::Vm => rows(&self.vms, |r| &r.tag_list),
            ResourceKind::Disk => rows(&self.disks, |r| &r.tag_list),
            ResourceKind::Nlb => rows(&self.nlbs, |r| &r.tag_list),
            ResourceKind::Cluster => rows(&self.clusters, |r| &r.tag_list),
            ResourceKind::MyImage => rows(&self.my_images, |r| &r.tag_list),
            ResourceKind::Image | ResourceKind::Subnet | ResourceKind::NodeGroup => {
                return Err(DriverError::unsupported(format!("tags on {}", kind)));
            }
        })
    }
}

impl Default for CloudState {
    fn default() -> Self {
        Self {
            vpcs: Table::new(ResourceKind::Vpc),
            security_groups: Table::new(ResourceKind::SecurityGroup),
            key_pairs: Table::new(ResourceKind::KeyPair),
            vms: Table::new(ResourceKind::Vm),
            vm_status: HashMap::new(),
            disks: Table::new(ResourceKind::Disk),
            nlbs: Table::new(ResourceKind::Nlb),
            clusters: Table::new(ResourceKind::Cluster),
            my_images: Table::new(ResourceKind::MyImage),
        }
    }
}

/// A named in-memory cloud
#[derive(Debug)]
pub struct MockCloud {
    name: String,
    state: Mutex<CloudState>,
    calls: Mutex<HashMap<String, usize>>,
    failures: Mutex<HashSet<String>>,
    latency: Mutex<Duration>,
    seq: AtomicU64,
    closes: AtomicUsize,
}

impl MockCloud {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(CloudState::default()),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashSet::new()),
            latency: Mutex::new(Duration::ZERO),
            seq: AtomicU64::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    /// Returns the cloud registered under `name`, creating it on first use
    pub fn named(name: &str) -> Arc<MockCloud> {
        lock(&CLOUDS)
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MockCloud::new(name)))
            .clone()
    }

    /// Forgets every resource and counter of the cloud called `name`
    pub fn reset(name: &str) {
        lock(&CLOUDS).remove(name);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delays every subsequent operation
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    /// Makes the next call of `op` (e.g. `"vpc.create"`) fail with a provider error
    pub fn fail_next(&self, op: &str) {
        lock(&self.failures).insert(op.to_string());
    }

    pub fn call_count(&self, op: &str) -> usize {
        lock(&self.calls).get(op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    /// Times a connection to this cloud was asked to close
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn record_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of live resources of `kind`
    pub fn count(&self, kind: ResourceKind) -> usize {
        let state = lock(&self.state);
        match kind {
            ResourceKind::Vpc => state.vpcs.len(),
            ResourceKind::Subnet => state
                .vpcs
                .list()
                .iter()
                .map(|v| v.subnet_info_list.len())
                .sum(),
            ResourceKind::SecurityGroup => state.security_groups.len(),
            ResourceKind::KeyPair => state.key_pairs.len(),
            ResourceKind::Vm => state.vms.len(),
            ResourceKind::Disk => state.disks.len(),
            ResourceKind::Nlb => state.nlbs.len(),
            ResourceKind::Cluster => state.clusters.len(),
            ResourceKind::NodeGroup => state
                .clusters
                .list()
                .iter()
                .map(|c| c.node_group_list.len())
                .sum(),
            ResourceKind::MyImage => state.my_images.len(),
            ResourceKind::Image => crate::handlers::catalog::public_images().len(),
        }
    }

    /// Creates a resource directly on the provider side, bypassing the
    /// control plane. The resource carries `system_id` and `name`.
    pub fn seed(&self, kind: ResourceKind, name: &str, system_id: &str) {
        let iid = Iid::new(name, system_id);
        let mut state = lock(&self.state);
        match kind {
            ResourceKind::Vpc => state.vpcs.insert(VpcInfo {
                iid,
                ipv4_cidr: "10.0.0.0/16".into(),
                ..Default::default()
            }),
            ResourceKind::SecurityGroup => state.security_groups.insert(SecurityInfo {
                iid,
                ..Default::default()
            }),
            ResourceKind::KeyPair => state.key_pairs.insert(KeyPairInfo {
                iid,
                ..Default::default()
            }),
            ResourceKind::Vm => {
                state.vm_status.insert(system_id.to_string(), VmStatus::Running);
                state.vms.insert(VmInfo {
                    iid,
                    ..Default::default()
                })
            }
            ResourceKind::Disk => state.disks.insert(DiskInfo {
                iid,
                ..Default::default()
            }),
            ResourceKind::Nlb => state.nlbs.insert(NlbInfo {
                iid,
                ..Default::default()
            }),
            ResourceKind::Cluster => state.clusters.insert(ClusterInfo {
                iid,
                ..Default::default()
            }),
            ResourceKind::MyImage => state.my_images.insert(MyImageInfo {
                iid,
                ..Default::default()
            }),
            ResourceKind::Image | ResourceKind::Subnet | ResourceKind::NodeGroup => {
                tracing::warn!("mock cloud cannot seed {} resources", kind);
            }
        }
    }

    /// Removes a resource on the provider side only
    pub fn forget(&self, kind: ResourceKind, system_id: &str) {
        let iid = Iid::new("", system_id);
        let mut state = lock(&self.state);
        let _ = match kind {
            ResourceKind::Vpc => state.vpcs.remove(&iid).map(|_| ()),
            ResourceKind::SecurityGroup => state.security_groups.remove(&iid).map(|_| ()),
            ResourceKind::KeyPair => state.key_pairs.remove(&iid).map(|_| ()),
            ResourceKind::Vm => state.vms.remove(&iid).map(|_| ()),
            ResourceKind::Disk => state.disks.remove(&iid).map(|_| ()),
            ResourceKind::Nlb => state.nlbs.remove(&iid).map(|_| ()),
            ResourceKind::Cluster => state.clusters.remove(&iid).map(|_| ()),
            ResourceKind::MyImage => state.my_images.remove(&iid).map(|_| ()),
            ResourceKind::Image | ResourceKind::Subnet | ResourceKind::NodeGroup => Ok(()),
        };
    }

    /// Counts the call, applies latency and injected failures
    pub(crate) async fn enter(&self, op: &str) -> Result<()> {
        *lock(&self.calls).entry(op.to_string()).or_default() += 1;

        let latency = *lock(&self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if lock(&self.failures).remove(op) {
            tracing::debug!(cloud = %self.name, op, "injected failure");
            return Err(DriverError::provider(format!("injected failure on {}", op)));
        }
        Ok(())
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, CloudState> {
        lock(&self.state)
    }

    /// Provider-style identifier, e.g. `vpc-0000002a`
    pub(crate) fn next_id(&self, prefix: &str) -> String {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{:08x}", prefix, n)
    }
}
