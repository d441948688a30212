//! 账户存储：CredentialStore 接口与两种实现

use super::models::{Account, AccountPatch, NewAccount};
use super::secret::token_matches;
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

/// 账户持久化接口。
/// 所有操作在单条记录层面是原子的；"未找到"一律以 None/0 表达，而不是错误。
/// 任何满足该接口的存储引擎都可以替换进各个流程。
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 创建账户并分配 ID；邮箱已存在时返回 DuplicateEmail
    async fn create(&self, new: NewAccount) -> Result<Account>;

    /// 按邮箱查找
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// 按 ID 查找
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>>;

    /// 应用部分更新，返回受影响的记录数（0 或 1）。
    /// patch 携带的 expect_* 前置条件不满足时不做任何修改并返回 0，
    /// 因此"读取-检查-清除"一个 token 对调用方而言是单个逻辑步骤。
    async fn update(&self, id: i64, patch: AccountPatch) -> Result<u64>;

    /// 删除账户，返回被删除的记录
    async fn remove(&self, id: i64) -> Result<Option<Account>>;

    /// 按 ID 升序列出全部账户
    async fn list(&self) -> Result<Vec<Account>>;
}

/// patch 的 expect_* 前置条件；token 比较走常量时间路径
fn guards_hold(account: &Account, patch: &AccountPatch) -> bool {
    if let Some(expected) = &patch.expect_verification_token {
        if !optional_token_matches(expected.as_deref(), account.verification_token.as_deref()) {
            return false;
        }
    }
    if let Some(expected) = &patch.expect_reset_token {
        if !optional_token_matches(expected.as_deref(), account.reset_password_token.as_deref()) {
            return false;
        }
    }
    true
}

fn optional_token_matches(expected: Option<&str>, current: Option<&str>) -> bool {
    match (expected, current) {
        (None, None) => true,
        (Some(e), Some(c)) => token_matches(e, c),
        _ => false,
    }
}

fn apply_patch(account: &mut Account, patch: AccountPatch) {
    if let Some(username) = patch.username {
        account.username = username;
    }
    if let Some(password_hash) = patch.password_hash {
        account.password_hash = password_hash;
    }
    if let Some(is_verified) = patch.is_verified {
        account.is_verified = is_verified;
    }
    if let Some(token) = patch.verification_token {
        account.verification_token = token;
    }
    if let Some(token) = patch.reset_password_token {
        account.reset_password_token = token;
    }
    account.updated_at = Utc::now();
}

/// 邮箱索引与 ID 序列，随账户文件一起持久化
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreIndex {
    #[serde(default)]
    next_id: i64,
    #[serde(default)]
    by_email: HashMap<String, i64>,
}

/// 基于 JSON 文件的账户存储：每个账户一个文件，外加一个索引文件。
/// 写路径统一经过内部互斥锁，邮箱唯一性检查、ID 分配与条件更新
/// 都在同一个临界区内完成。
#[derive(Debug)]
pub struct JsonCredentialStore {
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonCredentialStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// 确保账户目录存在
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.accounts_dir())?;
        Ok(())
    }

    fn accounts_dir(&self) -> PathBuf {
        self.data_dir.join("accounts")
    }

    fn account_path(&self, id: i64) -> PathBuf {
        self.accounts_dir().join(format!("{}.json", id))
    }

    fn index_path(&self) -> PathBuf {
        self.accounts_dir().join("index.json")
    }

    fn load_index(&self) -> StoreIndex {
        if let Ok(data) = fs::read(self.index_path()) {
            if let Ok(index) = serde_json::from_slice::<StoreIndex>(&data) {
                return index;
            }
        }
        StoreIndex::default()
    }

    fn save_index(&self, index: &StoreIndex) -> Result<()> {
        let data = serde_json::to_vec_pretty(index)?;
        fs::write(self.index_path(), data)?;
        Ok(())
    }

    fn read_account(&self, id: i64) -> Result<Option<Account>> {
        let path = self.account_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        let account: Account = serde_json::from_slice(&data)?;
        Ok(Some(account))
    }

    fn persist_account(&self, account: &Account) -> Result<()> {
        let data = serde_json::to_vec_pretty(account)?;
        fs::write(self.account_path(account.id), data)?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for JsonCredentialStore {
    async fn create(&self, new: NewAccount) -> Result<Account> {
        let _guard = self.write_lock.lock().await;
        self.ensure_dirs()?;

        let mut index = self.load_index();
        if index.by_email.contains_key(&new.email) {
            return Err(ServiceError::DuplicateEmail(new.email));
        }

        let id = if index.next_id > 0 { index.next_id } else { 1 };
        let now = Utc::now();
        let account = Account {
            id,
            email: new.email,
            username: new.username,
            password_hash: new.password_hash,
            is_verified: false,
            verification_token: new.verification_token,
            reset_password_token: None,
            role: new.role,
            created_at: now,
            updated_at: now,
        };

        self.persist_account(&account)?;
        index.next_id = id + 1;
        index.by_email.insert(account.email.clone(), id);
        self.save_index(&index)?;

        info!(account_id = id, "created account");
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let index = self.load_index();
        match index.by_email.get(email) {
            Some(id) => self.read_account(*id),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        self.read_account(id)
    }

    async fn update(&self, id: i64, patch: AccountPatch) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let mut account = match self.read_account(id)? {
            Some(account) => account,
            None => return Ok(0),
        };
        if !guards_hold(&account, &patch) {
            return Ok(0);
        }
        apply_patch(&mut account, patch);
        self.persist_account(&account)?;
        Ok(1)
    }

    async fn remove(&self, id: i64) -> Result<Option<Account>> {
        let _guard = self.write_lock.lock().await;
        let account = match self.read_account(id)? {
            Some(account) => account,
            None => return Ok(None),
        };
        fs::remove_file(self.account_path(id))?;
        let mut index = self.load_index();
        index.by_email.remove(&account.email);
        self.save_index(&index)?;
        info!(account_id = id, "removed account");
        Ok(Some(account))
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let dir = self.accounts_dir();
        let mut accounts = Vec::new();
        if dir.exists() {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.file_stem().map(|s| s == "index").unwrap_or(false) {
                    continue;
                }
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    let data = fs::read(&path)?;
                    if let Ok(account) = serde_json::from_slice::<Account>(&data) {
                        accounts.push(account);
                    }
                }
            }
        }
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }
}

/// 内存实现，语义与 JsonCredentialStore 一致；用于流程单测或临时部署
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: i64,
    accounts: HashMap<i64, Account>,
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, new: NewAccount) -> Result<Account> {
        let mut inner = self.inner.lock().await;
        if inner.accounts.values().any(|a| a.email == new.email) {
            return Err(ServiceError::DuplicateEmail(new.email));
        }
        let id = if inner.next_id > 0 { inner.next_id } else { 1 };
        let now = Utc::now();
        let account = Account {
            id,
            email: new.email,
            username: new.username,
            password_hash: new.password_hash,
            is_verified: false,
            verification_token: new.verification_token,
            reset_password_token: None,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        inner.next_id = id + 1;
        inner.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let inner = self.inner.lock().await;
        Ok(inner.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let inner = self.inner.lock().await;
        Ok(inner.accounts.get(&id).cloned())
    }

    async fn update(&self, id: i64, patch: AccountPatch) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let account = match inner.accounts.get_mut(&id) {
            Some(account) => account,
            None => return Ok(0),
        };
        if !guards_hold(account, &patch) {
            return Ok(0);
        }
        apply_patch(account, patch);
        Ok(1)
    }

    async fn remove(&self, id: i64) -> Result<Option<Account>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.accounts.remove(&id))
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let inner = self.inner.lock().await;
        let mut accounts: Vec<Account> = inner.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }
}
