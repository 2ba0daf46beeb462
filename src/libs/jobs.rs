//! A small job tree runner.
//!
//! A job may add children, which run in parallel after it returns, and one
//! follow-on, which runs after every child (and their descendants) succeeded.

use rayon::prelude::*;

pub trait Job: Send + Sync {
    fn name(&self) -> String;

    fn run(&self, ctx: &mut JobContext) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct JobContext {
    children: Vec<Box<dyn Job>>,
    follow_on: Option<Box<dyn Job>>,
}

impl JobContext {
    pub fn add_child(&mut self, job: impl Job + 'static) {
        self.children.push(Box::new(job));
    }

    /// A later call replaces the earlier follow-on
    pub fn set_follow_on(&mut self, job: impl Job + 'static) {
        self.follow_on = Some(Box::new(job));
    }
}

pub struct Stack {
    root: Box<dyn Job>,
    threads: usize,
    retry_count: usize,
}

impl Stack {
    pub fn new(root: impl Job + 'static) -> Self {
        Self {
            root: Box::new(root),
            threads: 1,
            retry_count: 0,
        }
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn retry_count(mut self, retry_count: usize) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Runs the whole tree and returns the number of failed jobs.
    pub fn run(self) -> anyhow::Result<usize> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()?;
        let retry_count = self.retry_count;
        let root = self.root;

        Ok(pool.install(|| execute(root.as_ref(), retry_count)))
    }
}

// Failed jobs in the subtree rooted at `job`
fn execute(job: &dyn Job, retry_count: usize) -> usize {
    let mut attempt = 0;
    let ctx = loop {
        let mut ctx = JobContext::default();
        match job.run(&mut ctx) {
            Ok(()) => break ctx,
            Err(e) if attempt < retry_count => {
                attempt += 1;
                log::warn!(
                    "Job {} failed, retry {}/{}: {:#}",
                    job.name(),
                    attempt,
                    retry_count,
                    e
                );
            }
            Err(e) => {
                log::error!("Job {} failed: {:#}", job.name(), e);
                return 1;
            }
        }
    };

    let failed: usize = ctx
        .children
        .par_iter()
        .map(|child| execute(child.as_ref(), retry_count))
        .sum();

    if failed > 0 {
        if let Some(follow_on) = &ctx.follow_on {
            log::warn!("Skip {}: {} upstream job(s) failed", follow_on.name(), failed);
        }
        return failed;
    }

    match &ctx.follow_on {
        Some(follow_on) => execute(follow_on.as_ref(), retry_count),
        None => 0,
    }
}
