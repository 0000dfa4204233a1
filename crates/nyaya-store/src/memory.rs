use std::collections::BTreeMap;
use std::sync::Mutex;

use nyaya_core::CaseRecord;

use crate::{CaseStore, StoreError, apply_update};

/// Process-local store; contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cases: Mutex<BTreeMap<String, CaseRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cases(cases: impl IntoIterator<Item = CaseRecord>) -> Self {
        Self {
            cases: Mutex::new(cases.into_iter().map(|c| (c.case_id.clone(), c)).collect()),
        }
    }
}

impl CaseStore for MemoryStore {
    fn get(&self, case_id: &str) -> Result<CaseRecord, StoreError> {
        let cases = self.cases.lock().unwrap_or_else(|e| e.into_inner());
        cases
            .get(case_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(case_id.to_string()))
    }

    fn insert(&self, record: CaseRecord) -> Result<(), StoreError> {
        let mut cases = self.cases.lock().unwrap_or_else(|e| e.into_inner());
        if cases.contains_key(&record.case_id) {
            return Err(StoreError::AlreadyExists(record.case_id));
        }
        cases.insert(record.case_id.clone(), record);
        Ok(())
    }

    fn list(&self) -> Result<Vec<CaseRecord>, StoreError> {
        let cases = self.cases.lock().unwrap_or_else(|e| e.into_inner());
        Ok(cases.values().cloned().collect())
    }

    fn update(
        &self,
        case_id: &str,
        apply: &mut dyn FnMut(&mut CaseRecord) -> Result<(), StoreError>,
    ) -> Result<CaseRecord, StoreError> {
        let mut cases = self.cases.lock().unwrap_or_else(|e| e.into_inner());
        let current = cases
            .get(case_id)
            .ok_or_else(|| StoreError::NotFound(case_id.to_string()))?;
        let updated = apply_update(current, apply)?;
        cases.insert(case_id.to_string(), updated.clone());
        Ok(updated)
    }
}
