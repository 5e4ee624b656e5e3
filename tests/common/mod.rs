//! In-memory session that records every statement it receives

#![allow(dead_code)]

use async_trait::async_trait;
use sqlcrud::database::{ColumnInfo, DatabaseSession, RowSet, SqlValue, Transaction};
use sqlcrud::{DatabaseBackend, Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct State {
    pub log: Vec<String>,
    pub args: Vec<Vec<SqlValue>>,
    /// Rows held by the single fake table, one BIGINT `id` column
    pub stored: Vec<Vec<SqlValue>>,
    /// Query results returned ahead of the stored rows
    pub scripted: VecDeque<RowSet>,
    /// Statements containing this text fail
    pub fail_on: Option<String>,
}

impl State {
    fn run_execute(&mut self, sql: &str, args: Vec<SqlValue>) -> Result<u64> {
        self.log.push(sql.to_string());
        self.args.push(args);
        if let Some(marker) = &self.fail_on {
            if sql.contains(marker.as_str()) {
                return Err(Error::execution(format!("statement failed: {}", sql)));
            }
        }
        if sql.starts_with("INSERT") {
            self.stored.push(vec![SqlValue::BigInt(self.stored.len() as i64 + 1)]);
            Ok(1)
        } else if sql.starts_with("DELETE") {
            let n = self.stored.len() as u64;
            self.stored.clear();
            Ok(n)
        } else {
            Ok(self.stored.len() as u64)
        }
    }

    fn run_query(&mut self, sql: &str, args: Vec<SqlValue>) -> Result<RowSet> {
        self.log.push(sql.to_string());
        self.args.push(args);
        if let Some(set) = self.scripted.pop_front() {
            return Ok(set);
        }
        Ok(RowSet::new(
            vec![ColumnInfo::new("id", "BIGINT")],
            self.stored.clone(),
        ))
    }
}

#[derive(Clone)]
pub struct RecordingSession {
    backend: DatabaseBackend,
    pub state: Arc<Mutex<State>>,
    /// Held by a transaction for its whole life, serialising them
    serial: Arc<AsyncMutex<()>>,
}

impl RecordingSession {
    pub fn new(backend: DatabaseBackend) -> Self {
        RecordingSession {
            backend,
            state: Arc::new(Mutex::new(State::default())),
            serial: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn args(&self) -> Vec<Vec<SqlValue>> {
        self.state.lock().unwrap().args.clone()
    }

    pub fn script(&self, set: RowSet) {
        self.state.lock().unwrap().scripted.push_back(set);
    }

    pub fn fail_on(&self, marker: &str) {
        self.state.lock().unwrap().fail_on = Some(marker.to_string());
    }

    pub fn store_rows(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        for i in 0..n {
            state.stored.push(vec![SqlValue::BigInt(i as i64 + 1)]);
        }
    }
}

#[async_trait]
impl DatabaseSession for RecordingSession {
    fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    async fn execute(&self, sql: &str, args: Vec<SqlValue>) -> Result<u64> {
        self.state.lock().unwrap().run_execute(sql, args)
    }

    async fn query(&self, sql: &str, args: Vec<SqlValue>) -> Result<RowSet> {
        self.state.lock().unwrap().run_query(sql, args)
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = self.serial.clone().lock_owned().await;
        self.state.lock().unwrap().log.push("BEGIN".to_string());
        Ok(Box::new(RecordingTransaction {
            state: self.state.clone(),
            _guard: guard,
        }))
    }

    async fn ping(&self) -> Result<bool> {
        Ok(true)
    }
}

pub struct RecordingTransaction {
    state: Arc<Mutex<State>>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl Transaction for RecordingTransaction {
    async fn execute(&mut self, sql: &str, args: Vec<SqlValue>) -> Result<u64> {
        self.state.lock().unwrap().run_execute(sql, args)
    }

    async fn query(&mut self, sql: &str, args: Vec<SqlValue>) -> Result<RowSet> {
        // Yield so concurrent callers get a chance to interleave
        tokio::task::yield_now().await;
        self.state.lock().unwrap().run_query(sql, args)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.state.lock().unwrap().log.push("COMMIT".to_string());
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.state.lock().unwrap().log.push("ROLLBACK".to_string());
        Ok(())
    }
}
