// ==========================================
// 学校学生管理系统 - 事务化工作单元
// ==========================================
// 职责: 在单个数据库事务中执行调用方提供的工作块
//   - 工作块返回 Ok → 提交；返回 Err → 回滚后原样上抛
//   - 瞬时故障（BUSY/LOCKED）→ 按 RetryPolicy 从头重放整个工作块（新事务）
//   - 每次逻辑调用至多一次成功提交；失败尝试的写入均已回滚，不可见
// 约束: 工作块可能被执行多次，调用方须保证其幂等
//       （推荐: 内存中累积完成后，在工作块内一次性写入）
// ==========================================

use crate::config::RetrySettings;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

// ==========================================
// RetryPolicy - 指数退避重试策略
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 总尝试次数（含首次），至少为 1
    pub max_attempts: u32,
    /// 首次重试前的等待
    pub initial_delay: Duration,
    /// 两次尝试之间等待的上限
    pub max_delay: Duration,
    /// 每次失败后等待时间的增长倍数
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: settings.initial_delay(),
            max_delay: settings.max_delay(),
            multiplier: settings.multiplier,
        }
    }

    /// 不重试（单次尝试）
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// 根据当前等待时间计算下一次等待，结果不超过 max_delay
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_delay)
    }
}

// ==========================================
// UnitOfWork - 工作单元
// ==========================================
#[derive(Clone)]
pub struct UnitOfWork {
    conn: Arc<Mutex<Connection>>,
    retry: RetryPolicy,
}

impl UnitOfWork {
    pub fn new(conn: Arc<Mutex<Connection>>, retry: RetryPolicy) -> Self {
        Self { conn, retry }
    }

    /// 在事务中执行工作块（无返回值）
    pub fn run_in_transaction<F>(&self, work: F) -> RepositoryResult<()>
    where
        F: FnMut(&Transaction<'_>) -> RepositoryResult<()>,
    {
        self.run_in_transaction_with_result(work)
    }

    /// 在事务中执行工作块，并返回工作块的结果
    ///
    /// # 返回
    /// - Ok(T): 工作块成功且事务已提交
    /// - Err(RetriesExhausted): 瞬时故障重试耗尽
    /// - Err(其他): 非瞬时错误，事务已回滚，不重试
    pub fn run_in_transaction_with_result<T, F>(&self, mut work: F) -> RepositoryResult<T>
    where
        F: FnMut(&Transaction<'_>) -> RepositoryResult<T>,
    {
        let value = self.with_retry(|| self.run_once(&mut work))?;
        debug!("事务已提交");
        Ok(value)
    }

    /// 按 RetryPolicy 执行不需要事务的操作（如只读快照加载）
    ///
    /// 操作内部自行加锁，本方法不持有连接
    pub fn with_retry<T, F>(&self, mut op: F) -> RepositoryResult<T>
    where
        F: FnMut() -> RepositoryResult<T>,
    {
        let mut delay = self.retry.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "遇到瞬时故障，准备重试"
                    );
                    std::thread::sleep(delay);
                    delay = self.retry.next_delay(delay);
                }
                Err(e) if e.is_transient() => {
                    warn!(attempt, error = %e, "重试次数已耗尽");
                    return Err(RepositoryError::RetriesExhausted {
                        attempts: attempt,
                        last_error: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 单次尝试: 开启新事务 → 执行 → 提交或回滚
    ///
    /// 连接锁仅在本次尝试内持有，重试等待期间不占用
    fn run_once<T, F>(&self, work: &mut F) -> RepositoryResult<T>
    where
        F: FnMut(&Transaction<'_>) -> RepositoryResult<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        // IMMEDIATE: 开事务即获取写锁，BUSY 在开头暴露而非提交时
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;

        match work(&tx) {
            Ok(value) => {
                // 提交失败时 Transaction 的 Drop 会回滚
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "事务回滚失败");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE item (name TEXT NOT NULL UNIQUE);")
            .unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    fn count(conn: &Arc<Mutex<Connection>>) -> i64 {
        conn.lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM item", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_commit_on_success() {
        let conn = setup();
        let uow = UnitOfWork::new(conn.clone(), fast_retry(3));

        uow.run_in_transaction(|tx| {
            tx.execute("INSERT INTO item (name) VALUES ('a')", [])?;
            tx.execute("INSERT INTO item (name) VALUES ('b')", [])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(count(&conn), 2);
    }

    #[test]
    fn test_rollback_on_error_without_retry() {
        let conn = setup();
        let uow = UnitOfWork::new(conn.clone(), fast_retry(3));
        let calls = Cell::new(0);

        let result = uow.run_in_transaction(|tx| {
            calls.set(calls.get() + 1);
            tx.execute("INSERT INTO item (name) VALUES ('a')", [])?;
            // 违反唯一约束: 非瞬时错误
            tx.execute("INSERT INTO item (name) VALUES ('a')", [])?;
            Ok(())
        });

        assert!(matches!(
            result,
            Err(RepositoryError::UniqueConstraintViolation(_))
        ));
        assert_eq!(calls.get(), 1);
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn test_transient_failure_retries_and_commits_once() {
        let conn = setup();
        let uow = UnitOfWork::new(conn.clone(), fast_retry(3));
        let calls = Cell::new(0);

        uow.run_in_transaction(|tx| {
            calls.set(calls.get() + 1);
            tx.execute("INSERT INTO item (name) VALUES ('a')", [])?;
            tx.execute("INSERT INTO item (name) VALUES ('b')", [])?;
            if calls.get() == 1 {
                return Err(RepositoryError::Transient("database is locked".into()));
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(calls.get(), 2);
        // 第一次尝试的写入已回滚，只有一份
        assert_eq!(count(&conn), 2);
    }

    #[test]
    fn test_retries_exhausted() {
        let conn = setup();
        let uow = UnitOfWork::new(conn.clone(), fast_retry(3));
        let calls = Cell::new(0);

        let result: RepositoryResult<()> = uow.run_in_transaction(|tx| {
            calls.set(calls.get() + 1);
            tx.execute("INSERT INTO item (name) VALUES ('a')", [])?;
            Err(RepositoryError::Transient("database is locked".into()))
        });

        match result {
            Err(RepositoryError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.get(), 3);
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn test_with_result_returns_value() {
        let conn = setup();
        let uow = UnitOfWork::new(conn.clone(), RetryPolicy::no_retry());

        let inserted = uow
            .run_in_transaction_with_result(|tx| {
                let mut n = 0;
                for name in ["x", "y", "z"] {
                    n += tx.execute("INSERT INTO item (name) VALUES (?1)", [name])?;
                }
                Ok(n)
            })
            .unwrap();

        assert_eq!(inserted, 3);
        assert_eq!(count(&conn), 3);
    }

    #[test]
    fn test_with_retry_runs_without_transaction() {
        let conn = setup();
        let uow = UnitOfWork::new(conn.clone(), fast_retry(3));
        let calls = Cell::new(0);

        let value = uow
            .with_retry(|| {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    return Err(RepositoryError::Transient("database is locked".into()));
                }
                // 未持有连接锁，操作可自行加锁
                Ok(count(&conn))
            })
            .unwrap();

        assert_eq!(value, 0);
        assert_eq!(calls.get(), 3);

        let calls = Cell::new(0);
        let result: RepositoryResult<()> = uow.with_retry(|| {
            calls.set(calls.get() + 1);
            Err(RepositoryError::DatabaseQueryError("no such table".into()))
        });
        assert!(matches!(result, Err(RepositoryError::DatabaseQueryError(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_next_delay_doubles_and_clamps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            multiplier: 2.0,
        };
        assert_eq!(
            policy.next_delay(Duration::from_millis(100)),
            Duration::from_millis(200)
        );
        assert_eq!(
            policy.next_delay(Duration::from_millis(200)),
            Duration::from_millis(300)
        );
    }
}
