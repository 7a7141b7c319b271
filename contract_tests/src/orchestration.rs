//! Contract test combining both surfaces: a dispatcher service that
//! accepts transactions and forwards the work onto its own looper
//! thread, the pattern the orchestration layer above the kernel uses.

use binder::{Binder, BinderObject, TransactError, FIRST_CALL_TRANSACTION};
use looper::Handler;
use parcel::Parcel;
use std::sync::{Arc, Mutex, Weak};

pub const DISPATCHER_DESCRIPTOR: &str = "kernel.IJobDispatcher";

/// One-way: enqueue a named job onto the dispatcher's worker thread.
pub const CODE_ENQUEUE_JOB: u32 = FIRST_CALL_TRANSACTION;
/// Two-way: reply with the number of jobs accepted so far.
pub const CODE_ACCEPTED_COUNT: u32 = FIRST_CALL_TRANSACTION + 1;

/// Binder service that schedules accepted jobs onto a worker looper.
///
/// Callers see only the transaction surface; the worker thread sees only
/// the scheduling surface.
pub struct JobDispatcher {
    binder: Binder,
    worker: Handler,
    accepted: Mutex<u32>,
    completed: Arc<Mutex<Vec<String>>>,
}

impl JobDispatcher {
    pub fn new(worker: Handler) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<JobDispatcher>| {
            let binder = Binder::new();
            binder.attach_interface(me.clone(), DISPATCHER_DESCRIPTOR);
            JobDispatcher {
                binder,
                worker,
                accepted: Mutex::new(0),
                completed: Arc::new(Mutex::new(Vec::new())),
            }
        })
    }

    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

impl BinderObject for JobDispatcher {
    fn binder(&self) -> &Binder {
        &self.binder
    }

    fn on_transact(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: Option<&mut Parcel>,
        _flags: u32,
    ) -> Result<bool, TransactError> {
        data.enforce_interface(DISPATCHER_DESCRIPTOR)?;
        match code {
            CODE_ENQUEUE_JOB => {
                let job = data.read_string();
                let completed = self.completed.clone();
                let posted = self
                    .worker
                    .post(move || {
                        completed.lock().unwrap().push(job.clone());
                    })
                    .is_some();
                if !posted {
                    return Err(TransactError::ServiceFailure(
                        "worker looper is quitting".to_string(),
                    ));
                }
                *self.accepted.lock().unwrap() += 1;
                Ok(true)
            }
            CODE_ACCEPTED_COUNT => {
                if let Some(reply) = reply {
                    reply.write_int(*self.accepted.lock().unwrap() as i32);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::spawn_looper_thread;
    use binder::{ServiceManager, FLAG_ONEWAY};
    use std::thread;
    use std::time::{Duration, Instant};

    fn enqueue_job(service: &Arc<dyn BinderObject>, job: &str) -> bool {
        let mut data = Parcel::obtain();
        data.write_interface_token(DISPATCHER_DESCRIPTOR);
        data.write_string(job);
        data.set_data_position(0);
        let ok = service.transact(CODE_ENQUEUE_JOB, &mut data, None, FLAG_ONEWAY);
        data.recycle();
        ok
    }

    fn accepted_count(service: &Arc<dyn BinderObject>) -> i32 {
        let mut data = Parcel::obtain();
        data.write_interface_token(DISPATCHER_DESCRIPTOR);
        data.set_data_position(0);
        let mut reply = Parcel::obtain();
        assert!(service.transact(CODE_ACCEPTED_COUNT, &mut data, Some(&mut reply), 0));
        reply.set_data_position(0);
        let count = reply.read_int();
        data.recycle();
        reply.recycle();
        count
    }

    #[test]
    fn test_transactions_feed_the_worker_timeline() {
        let (looper, join) = spawn_looper_thread();
        let dispatcher = JobDispatcher::new(Handler::new(looper.clone()));

        let manager = ServiceManager::new();
        manager.add_service("job_dispatcher", dispatcher.clone());
        let service = manager.get_service("job_dispatcher").unwrap();

        assert!(enqueue_job(&service, "index"));
        assert!(enqueue_job(&service, "sync"));
        assert_eq!(accepted_count(&service), 2);

        let deadline = Instant::now() + Duration::from_secs(5);
        while dispatcher.completed().len() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(dispatcher.completed(), vec!["index", "sync"]);

        looper.quit();
        join.join().unwrap();
    }

    #[test]
    fn test_enqueue_after_worker_quit_fails_closed() {
        let (looper, join) = spawn_looper_thread();
        let dispatcher = JobDispatcher::new(Handler::new(looper.clone()));
        looper.quit();
        join.join().unwrap();

        let service: Arc<dyn BinderObject> = dispatcher;
        // The post is rejected inside the handler; the caller sees `false`.
        assert!(!enqueue_job(&service, "late"));
        assert_eq!(accepted_count(&service), 0);
    }
}
