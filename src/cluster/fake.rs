// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ClusterApi`] for unit tests.
//!
//! Objects are stored as JSON keyed by kind, namespace and name. Every write is
//! recorded so tests can assert exact write sequences, and individual
//! operations can be made to fail to exercise error propagation.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{ClusterApi, ClusterObject};

/// Cluster operation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Get,
    Create,
    Replace,
    Delete,
    List,
    Patch,
    PatchStatus,
}

/// One recorded write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Write {
    pub op: Op,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

type Key = (String, String, String);

#[derive(Default)]
pub struct FakeCluster {
    objects: Mutex<BTreeMap<Key, Value>>,
    writes: Mutex<Vec<Write>>,
    failures: Mutex<Vec<(Op, String)>>,
    unserved: Mutex<Vec<String>>,
    next_uid: Mutex<u64>,
}

fn key<K: ClusterObject>(namespace: &str, name: &str) -> Key {
    let ns = if K::CLUSTER_SCOPED { "" } else { namespace };
    (K::kind(&()).to_string(), ns.to_string(), name.to_string())
}

/// RFC 7386 JSON merge patch.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (k, v) in patch_map {
            if v.is_null() {
                target_map.remove(k);
            } else {
                merge_patch(target_map.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
    }
}

fn matches_selector(object: &Value, selector: &str) -> bool {
    let labels = object.pointer("/metadata/labels");
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels
                .and_then(|l| l.get(k))
                .and_then(Value::as_str)
                .is_some_and(|actual| actual == v),
            None => labels.and_then(|l| l.get(term)).is_some(),
        })
}

impl FakeCluster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object without recording a write.
    pub fn seed<K: ClusterObject>(&self, namespace: &str, object: &K) {
        let mut value = serde_json::to_value(object).expect("serializable object");
        if !K::CLUSTER_SCOPED {
            value["metadata"]["namespace"] = Value::String(namespace.to_string());
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key::<K>(namespace, &object.name_any()), value);
    }

    /// Reads an object directly, bypassing failure injection.
    #[must_use]
    pub fn object<K: ClusterObject>(&self, namespace: &str, name: &str) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(&key::<K>(namespace, name))
            .map(|v| serde_json::from_value(v.clone()).expect("stored object deserializes"))
    }

    /// Mutates a stored object in place without recording a write.
    pub fn modify<K: ClusterObject>(&self, namespace: &str, name: &str, f: impl FnOnce(&mut K)) {
        let mut object: K = self.object(namespace, name).expect("object to modify exists");
        f(&mut object);
        self.seed(namespace, &object);
    }

    /// Removes an object without recording a write.
    pub fn remove<K: ClusterObject>(&self, namespace: &str, name: &str) {
        self.objects.lock().unwrap().remove(&key::<K>(namespace, name));
    }

    #[must_use]
    pub fn contains<K: ClusterObject>(&self, namespace: &str, name: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&key::<K>(namespace, name))
    }

    #[must_use]
    pub fn count<K: ClusterObject>(&self) -> usize {
        let kind = K::kind(&()).to_string();
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(k, _, _)| *k == kind)
            .count()
    }

    #[must_use]
    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    /// Writes of one kind, as `(op, name)` pairs.
    #[must_use]
    pub fn writes_for(&self, kind: &str) -> Vec<(Op, String)> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.kind == kind)
            .map(|w| (w.op, w.name.clone()))
            .collect()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    /// Makes every `op` on `kind` fail until [`FakeCluster::clear_failures`].
    pub fn fail(&self, op: Op, kind: &str) {
        self.failures.lock().unwrap().push((op, kind.to_string()));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Stops serving `kind`, as on a cluster without the API group.
    ///
    /// Reads answer like [`super::KubeClusterApi`] does for a 404: `get` is
    /// absent, `list` is empty and `delete` succeeds. Writes fail.
    pub fn unserve(&self, kind: &str) {
        self.unserved.lock().unwrap().push(kind.to_string());
    }

    fn served<K: ClusterObject>(&self) -> bool {
        let kind = K::kind(&()).to_string();
        !self.unserved.lock().unwrap().contains(&kind)
    }

    fn check<K: ClusterObject>(&self, op: Op) -> Result<()> {
        let kind = K::kind(&()).to_string();
        if !self.served::<K>() && !matches!(op, Op::Get | Op::List | Op::Delete) {
            bail!("the server could not find the requested resource ({kind})");
        }
        if self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|(o, k)| *o == op && *k == kind)
        {
            bail!("injected {op:?} failure for {kind}");
        }
        Ok(())
    }

    fn record<K: ClusterObject>(&self, op: Op, namespace: &str, name: &str) {
        let (kind, namespace, _) = key::<K>(namespace, name);
        self.writes.lock().unwrap().push(Write {
            op,
            kind,
            namespace,
            name: name.to_string(),
        });
    }

    fn uid(&self) -> String {
        let mut next = self.next_uid.lock().unwrap();
        *next += 1;
        format!("uid-{next}")
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn get<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        self.check::<K>(Op::Get)?;
        if !self.served::<K>() {
            return Ok(None);
        }
        Ok(self.object(namespace, name))
    }

    async fn create<K: ClusterObject>(&self, namespace: &str, object: &K) -> Result<K> {
        self.check::<K>(Op::Create)?;
        let name = object.name_any();
        if self.contains::<K>(namespace, &name) {
            bail!("{} {namespace}/{name} already exists", K::kind(&()));
        }
        let mut created = object.clone();
        created.meta_mut().uid = Some(self.uid());
        created.meta_mut().resource_version = Some("1".to_string());
        self.seed(namespace, &created);
        self.record::<K>(Op::Create, namespace, &name);
        Ok(self.object(namespace, &name).expect("just created"))
    }

    async fn replace<K: ClusterObject>(&self, namespace: &str, object: &K) -> Result<K> {
        self.check::<K>(Op::Replace)?;
        let name = object.name_any();
        if !self.contains::<K>(namespace, &name) {
            bail!("{} {namespace}/{name} not found", K::kind(&()));
        }
        self.seed(namespace, object);
        self.record::<K>(Op::Replace, namespace, &name);
        Ok(self.object(namespace, &name).expect("just replaced"))
    }

    async fn delete<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<()> {
        self.check::<K>(Op::Delete)?;
        if self.served::<K>() && self.contains::<K>(namespace, name) {
            self.remove::<K>(namespace, name);
            self.record::<K>(Op::Delete, namespace, name);
        }
        Ok(())
    }

    async fn list<K: ClusterObject>(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<K>> {
        self.check::<K>(Op::List)?;
        if !self.served::<K>() {
            return Ok(Vec::new());
        }
        let kind = K::kind(&()).to_string();
        let objects = self.objects.lock().unwrap();
        objects
            .iter()
            .filter(|((k, ns, _), _)| *k == kind && (K::CLUSTER_SCOPED || ns == namespace))
            .filter(|(_, v)| matches_selector(v, label_selector))
            .map(|(_, v)| serde_json::from_value(v.clone()).map_err(|e| anyhow!(e)))
            .collect()
    }

    async fn patch_merge<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<K> {
        self.check::<K>(Op::Patch)?;
        self.apply_patch::<K>(namespace, name, patch)?;
        self.record::<K>(Op::Patch, namespace, name);
        Ok(self.object(namespace, name).expect("just patched"))
    }

    async fn patch_status<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<K> {
        self.check::<K>(Op::PatchStatus)?;
        self.apply_patch::<K>(namespace, name, patch)?;
        self.record::<K>(Op::PatchStatus, namespace, name);
        Ok(self.object(namespace, name).expect("just patched"))
    }
}

impl FakeCluster {
    fn apply_patch<K: ClusterObject>(&self, namespace: &str, name: &str, patch: &Value) -> Result<()> {
        let mut objects = self.objects.lock().unwrap();
        let target = objects
            .get_mut(&key::<K>(namespace, name))
            .ok_or_else(|| anyhow!("{} {namespace}/{name} not found", K::kind(&())))?;
        merge_patch(target, patch);
        Ok(())
    }
}

/// An `ArgoCD` instance as the API server would return it, with a UID set.
#[must_use]
pub fn argocd(name: &str, namespace: &str) -> crate::crd::ArgoCD {
    let mut instance = crate::crd::ArgoCD::new(name, crate::crd::ArgoCDSpec::default());
    instance.metadata.namespace = Some(namespace.to_string());
    instance.metadata.uid = Some(format!("{name}-uid"));
    instance.metadata.generation = Some(1);
    instance
}
