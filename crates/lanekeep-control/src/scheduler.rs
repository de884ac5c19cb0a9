//! 周期任务调度器
//!
//! 每个任务一个线程，共享同一个 [`StopSource`]：
//!
//! - **先等待后执行**：第一次 `tick()` 发生在启动后一个周期
//! - **阻塞等待**：周期之间阻塞在停止信号上，停止请求立即唤醒，没有忙等
//! - **跳过错过的周期**：`tick()` 超时后不补发，直接对齐到下一个未来的周期点
//! - **故障传播**：任一任务 `tick()` 失败，先调用该任务的 `on_fault()`，
//!   然后停止所有任务
//! - **停止收尾**：收到停止信号后每个任务的 `on_stop()` 恰好调用一次

use crate::stop::StopSource;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

/// 周期任务
pub trait PeriodicTask: Send + 'static {
    type Error: std::error::Error + Send + 'static;

    /// 每个周期调用一次
    fn tick(&mut self) -> Result<(), Self::Error>;

    /// 收到停止信号后调用一次
    fn on_stop(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// `tick()` 或 `on_stop()` 失败后调用一次（尽力而为的安全动作）
    fn on_fault(&mut self, _error: &Self::Error) {}

    /// 错过了 `missed` 个周期
    fn on_overrun(&mut self, _missed: u64) {}
}

/// 单个任务的运行统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub ticks: u64,
    pub overruns: u64,
}

/// 任务异常退出原因
#[derive(Debug)]
pub enum TaskExit<E> {
    Failed(E),
    Panicked,
}

/// 任务退出报告
#[derive(Debug)]
pub struct TaskReport<E> {
    pub name: String,
    pub outcome: Result<TaskStats, TaskExit<E>>,
}

/// 周期任务调度器
pub struct PeriodicScheduler<E> {
    stop: StopSource,
    tasks: Vec<(String, JoinHandle<Result<TaskStats, E>>)>,
}

impl<E: Send + 'static> PeriodicScheduler<E> {
    pub fn new(stop: StopSource) -> Self {
        Self {
            stop,
            tasks: Vec::new(),
        }
    }

    pub fn stop_source(&self) -> &StopSource {
        &self.stop
    }

    /// 在新线程上启动周期任务
    pub fn spawn<T>(&mut self, name: &str, period: Duration, task: T) -> std::io::Result<()>
    where
        T: PeriodicTask<Error = E>,
        E: std::error::Error,
    {
        if period.is_zero() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "period must be > 0",
            ));
        }
        let stop = self.stop.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_periodic(task, period, stop))?;
        self.tasks.push((name.to_string(), handle));
        Ok(())
    }

    /// 请求停止所有任务
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// 等待所有任务退出
    pub fn join(self) -> Vec<TaskReport<E>> {
        self.tasks
            .into_iter()
            .map(|(name, handle)| {
                let outcome = match handle.join() {
                    Ok(Ok(stats)) => Ok(stats),
                    Ok(Err(e)) => Err(TaskExit::Failed(e)),
                    Err(_) => {
                        error!("periodic task '{}' panicked", name);
                        Err(TaskExit::Panicked)
                    },
                };
                TaskReport { name, outcome }
            })
            .collect()
    }
}

fn run_periodic<T: PeriodicTask>(
    mut task: T,
    period: Duration,
    stop: StopSource,
) -> Result<TaskStats, T::Error> {
    let token = stop.token();
    let mut stats = TaskStats::default();
    let mut next = Instant::now() + period;

    loop {
        if token.wait_deadline(next) {
            break;
        }

        if let Err(e) = task.tick() {
            error!("periodic task failed: {}", e);
            task.on_fault(&e);
            stop.stop();
            return Err(e);
        }
        stats.ticks += 1;
        trace!(ticks = stats.ticks, "tick");

        next += period;
        let now = Instant::now();
        if next <= now {
            let behind = now.duration_since(next);
            let missed = (behind.as_nanos() / period.as_nanos()) as u64 + 1;
            stats.overruns += missed;
            debug!("tick overrun: missed {} period(s)", missed);
            task.on_overrun(missed);
            next += period * missed as u32;
        }
    }

    if let Err(e) = task.on_stop() {
        error!("periodic task stop handler failed: {}", e);
        task.on_fault(&e);
        return Err(e);
    }
    Ok(stats)
}
