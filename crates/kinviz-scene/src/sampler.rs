//! Workspace sampling and manipulability.
//!
//! Sampling draws random joint configurations, records the TCP position
//! for each and then scores every kept configuration with the
//! manipulability index of its Jacobian. Results are plain values so a
//! worker thread can produce them and the scene owner can apply them in
//! one step.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use glam::DVec3;
use kinviz_core::{Environment, EnvironmentError, Jacobian, JointValues};
use nalgebra::DMatrix;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::SceneError;

/// Cooperative cancellation flag, checked between samples
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<(), SceneError> {
        if self.is_cancelled() {
            Err(SceneError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// What to sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    /// Joints drawn at random
    pub joint_names: Vec<String>,
    /// `(min, max)` per joint; joints without an entry use `continuous_range`
    pub joint_limits: BTreeMap<String, (f64, f64)>,
    pub n_samples: usize,
    /// Link whose origin is recorded
    pub tcp_link: String,
    /// Values of joints that are not sampled
    pub base_values: JointValues,
    pub continuous_range: (f64, f64),
    pub seed: Option<u64>,
}

impl SampleRequest {
    pub fn new(tcp_link: impl Into<String>, n_samples: usize) -> Self {
        Self {
            joint_names: Vec::new(),
            joint_limits: BTreeMap::new(),
            n_samples,
            tcp_link: tcp_link.into(),
            base_values: JointValues::new(),
            continuous_range: (-3.14, 3.14),
            seed: None,
        }
    }

    /// Sample every independent movable joint of `env` within its limits
    pub fn for_environment(
        env: &dyn Environment,
        tcp_link: impl Into<String>,
        n_samples: usize,
        continuous_range: (f64, f64),
    ) -> Self {
        let joint_limits = default_limits(env, continuous_range);
        Self {
            joint_names: joint_limits.keys().cloned().collect(),
            joint_limits,
            continuous_range,
            ..Self::new(tcp_link, n_samples)
        }
    }

    pub fn with_joints(
        mut self,
        joint_names: Vec<String>,
        joint_limits: BTreeMap<String, (f64, f64)>,
    ) -> Self {
        self.joint_names = joint_names;
        self.joint_limits = joint_limits;
        self
    }

    pub fn with_base_values(mut self, values: JointValues) -> Self {
        self.base_values = values;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_continuous_range(mut self, range: (f64, f64)) -> Self {
        self.continuous_range = range;
        self
    }
}

/// Sampling ranges for the independent movable joints of `env`.
///
/// Joints without usable limits get `continuous_range`.
pub fn default_limits(
    env: &dyn Environment,
    continuous_range: (f64, f64),
) -> BTreeMap<String, (f64, f64)> {
    env.joints()
        .iter()
        .filter(|j| j.joint_type.is_movable() && j.mimic.is_none())
        .map(|j| {
            let range = j
                .limits
                .filter(|l| l.is_bounded())
                .map(|l| l.range())
                .unwrap_or(continuous_range);
            (j.name.clone(), range)
        })
        .collect()
}

/// Reachable TCP positions with the configurations that produced them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceSamples {
    pub points: Vec<DVec3>,
    pub configurations: Vec<JointValues>,
    pub requested: usize,
    /// Configurations dropped because forward kinematics failed
    pub skipped: usize,
}

impl WorkspaceSamples {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Per-sample manipulability, index-aligned with the samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manipulability {
    pub scalars: Vec<f64>,
    /// False where the Jacobian was unavailable and the scalar is zero
    pub valid: Vec<bool>,
}

impl Manipulability {
    pub fn unavailable(&self) -> usize {
        self.valid.iter().filter(|v| !**v).count()
    }
}

/// Finished sampling run, ready for the workspace layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceResult {
    pub samples: WorkspaceSamples,
    pub manipulability: Manipulability,
}

impl WorkspaceResult {
    pub fn points(&self) -> &[DVec3] {
        &self.samples.points
    }

    pub fn scalars(&self) -> &[f64] {
        &self.manipulability.scalars
    }
}

/// Yoshikawa manipulability: product of the Jacobian's singular values,
/// i.e. `sqrt(det(J Jᵀ))` (or `sqrt(det(Jᵀ J))` for fewer than six joints)
pub fn manipulability_index(jacobian: &Jacobian) -> f64 {
    if jacobian.is_empty() {
        return 0.0;
    }
    let matrix = DMatrix::from_fn(jacobian.rows(), jacobian.cols(), |r, c| jacobian.get(r, c));
    let svd = matrix.svd(false, false);
    svd.singular_values.iter().product()
}

/// Both ends finite, ordered, and a span that does not overflow
fn is_sampling_range((lo, hi): (f64, f64)) -> bool {
    lo.is_finite() && hi.is_finite() && lo <= hi && (hi - lo).is_finite()
}

/// Runs sampling against an environment
pub struct WorkspaceSampler<'a> {
    env: &'a dyn Environment,
    cancel: CancelToken,
}

impl<'a> WorkspaceSampler<'a> {
    pub fn new(env: &'a dyn Environment) -> Self {
        Self {
            env,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Draw `n_samples` configurations and record the TCP position of each.
    ///
    /// Configurations whose forward kinematics fails are skipped and counted.
    pub fn sample(&self, request: &SampleRequest) -> Result<WorkspaceSamples, SceneError> {
        if self.env.link(&request.tcp_link).is_none() {
            return Err(EnvironmentError::UnknownLink(request.tcp_link.clone()).into());
        }

        let fallback = request.continuous_range;
        if !is_sampling_range(fallback) {
            return Err(SceneError::InvalidSamplingRange {
                lo: fallback.0,
                hi: fallback.1,
            });
        }

        let ranges: Vec<(&str, (f64, f64))> = request
            .joint_names
            .iter()
            .filter(|name| {
                let known = self.env.joint(name).is_some();
                if !known {
                    tracing::warn!(joint = %name, "Unknown joint, not sampled");
                }
                known
            })
            .map(|name| {
                let range = match request.joint_limits.get(name).copied() {
                    Some(range) if is_sampling_range(range) => range,
                    Some((lo, hi)) => {
                        tracing::warn!(
                            joint = %name,
                            lo,
                            hi,
                            "Unusable sampling range, using the continuous range"
                        );
                        fallback
                    }
                    None => fallback,
                };
                (name.as_str(), range)
            })
            .collect();

        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut samples = WorkspaceSamples {
            requested: request.n_samples,
            ..Default::default()
        };

        for _ in 0..request.n_samples {
            self.cancel.check()?;

            let mut values = request.base_values.clone();
            for &(name, (lo, hi)) in &ranges {
                let value = if lo < hi { rng.gen_range(lo..=hi) } else { lo };
                values.insert(name.to_string(), value);
            }

            match self.env.state(&values) {
                Ok(transforms) => match transforms.get(&request.tcp_link) {
                    Some(tcp) => {
                        samples.points.push(tcp.translation);
                        samples.configurations.push(values);
                    }
                    None => samples.skipped += 1,
                },
                Err(e) => {
                    tracing::debug!(error = %e, "Sample skipped");
                    samples.skipped += 1;
                }
            }
        }

        if samples.skipped > 0 {
            tracing::warn!(
                skipped = samples.skipped,
                requested = samples.requested,
                "Workspace samples skipped"
            );
        }
        Ok(samples)
    }

    /// Manipulability of each sample at `tcp_link`.
    ///
    /// Unavailable Jacobians give a zero scalar flagged invalid.
    pub fn compute_manipulability(
        &self,
        samples: &WorkspaceSamples,
        tcp_link: &str,
    ) -> Result<Manipulability, SceneError> {
        let mut result = Manipulability {
            scalars: Vec::with_capacity(samples.len()),
            valid: Vec::with_capacity(samples.len()),
        };

        for values in &samples.configurations {
            self.cancel.check()?;
            match self.env.jacobian(tcp_link, values) {
                Ok(jacobian) => {
                    result.scalars.push(manipulability_index(&jacobian));
                    result.valid.push(true);
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Jacobian unavailable");
                    result.scalars.push(0.0);
                    result.valid.push(false);
                }
            }
        }

        if result.unavailable() > 0 {
            tracing::warn!(count = result.unavailable(), link = %tcp_link, "Jacobian unavailable for samples");
        }
        Ok(result)
    }

    /// Sample and score in one call
    pub fn run(&self, request: &SampleRequest) -> Result<WorkspaceResult, SceneError> {
        let samples = self.sample(request)?;
        let manipulability = self.compute_manipulability(&samples, &request.tcp_link)?;
        tracing::info!(
            points = samples.len(),
            requested = samples.requested,
            "Workspace sampled"
        );
        Ok(WorkspaceResult {
            samples,
            manipulability,
        })
    }

    /// Run on a worker thread
    pub fn spawn(env: Arc<dyn Environment>, request: SampleRequest) -> SamplingJob {
        let cancel = CancelToken::new();
        let slot: Arc<Mutex<Option<Result<WorkspaceResult, SceneError>>>> = Arc::new(Mutex::new(None));

        let handle = {
            let cancel = cancel.clone();
            let slot = slot.clone();
            std::thread::spawn(move || {
                let result = WorkspaceSampler::new(env.as_ref())
                    .with_cancel(cancel)
                    .run(&request);
                *slot.lock() = Some(result);
            })
        };

        SamplingJob {
            cancel,
            slot,
            handle: Some(handle),
        }
    }
}

/// Handle to a sampling run on a worker thread
pub struct SamplingJob {
    cancel: CancelToken,
    slot: Arc<Mutex<Option<Result<WorkspaceResult, SceneError>>>>,
    handle: Option<JoinHandle<()>>,
}

impl SamplingJob {
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Take the result if the run is done (non-blocking)
    pub fn try_take(&mut self) -> Option<Result<WorkspaceResult, SceneError>> {
        let result = self.slot.lock().take();
        if result.is_some()
            && let Some(handle) = self.handle.take()
        {
            let _ = handle.join();
        }
        result
    }

    /// Wait for the run to finish
    pub fn join(mut self) -> Result<WorkspaceResult, SceneError> {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("Sampling thread panicked");
        }
        self.slot.lock().take().unwrap_or(Err(SceneError::WorkerFailed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use kinviz_core::UrdfEnvironment;

    const ARM: &str = r#"<robot name="arm">
  <link name="base"/>
  <link name="upper"/>
  <link name="tool"/>
  <joint name="shoulder" type="revolute">
    <parent link="base"/><child link="upper"/>
    <axis xyz="0 0 1"/>
    <limit lower="-1" upper="1" effort="1" velocity="1"/>
  </joint>
  <joint name="elbow" type="continuous">
    <parent link="upper"/><child link="tool"/>
    <origin xyz="1 0 0"/>
    <axis xyz="0 0 1"/>
  </joint>
</robot>"#;

    fn arm() -> UrdfEnvironment {
        UrdfEnvironment::from_urdf_str(ARM).unwrap()
    }

    #[test]
    fn test_default_limits_use_surrogate() {
        let limits = default_limits(&arm(), (-2.0, 2.0));
        assert_eq!(limits["shoulder"], (-1.0, 1.0));
        assert_eq!(limits["elbow"], (-2.0, 2.0));
    }

    #[test]
    fn test_sample_reachable_positions() {
        let env = arm();
        let request = SampleRequest::for_environment(&env, "tool", 200, (-3.14, 3.14)).with_seed(Some(1));
        let samples = WorkspaceSampler::new(&env).sample(&request).unwrap();
        assert_eq!(samples.len(), 200);
        assert_eq!(samples.skipped, 0);
        for (point, values) in samples.points.iter().zip(&samples.configurations) {
            // elbow only spins the tool about its own origin
            assert_abs_diff_eq!(point.length(), 1.0, epsilon = 1e-9);
            assert!(values["shoulder"].abs() <= 1.0);
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let env = arm();
        let request = SampleRequest::for_environment(&env, "tool", 20, (-3.14, 3.14)).with_seed(Some(9));
        let sampler = WorkspaceSampler::new(&env);
        assert_eq!(sampler.sample(&request).unwrap(), sampler.sample(&request).unwrap());
    }

    #[test]
    fn test_unknown_tcp_link() {
        let env = arm();
        let request = SampleRequest::new("ghost", 10);
        assert!(matches!(
            WorkspaceSampler::new(&env).sample(&request),
            Err(SceneError::Environment(EnvironmentError::UnknownLink(_)))
        ));
    }

    #[test]
    fn test_manipulability_aligned_and_flagged() {
        let env = arm();
        let sampler = WorkspaceSampler::new(&env);
        let request = SampleRequest::for_environment(&env, "tool", 10, (-3.14, 3.14)).with_seed(Some(3));
        let result = sampler.run(&request).unwrap();
        assert_eq!(result.points().len(), result.scalars().len());
        assert!(result.manipulability.valid.iter().all(|v| *v));

        // base has no movable joint above it
        let samples = sampler.sample(&SampleRequest::new("base", 5)).unwrap();
        let scores = sampler.compute_manipulability(&samples, "base").unwrap();
        assert_eq!(scores.scalars, vec![0.0; 5]);
        assert_eq!(scores.unavailable(), 5);
    }

    #[test]
    fn test_manipulability_index_planar() {
        // two unit links stretched along x: columns (0,2,0,0,0,1), (0,1,0,0,0,1)
        let jacobian = Jacobian {
            joint_names: vec!["a".into(), "b".into()],
            columns: vec![[0.0, 2.0, 0.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 0.0, 0.0, 1.0]],
        };
        // sqrt(det(JᵀJ)) = sqrt(5 * 2 - 3 * 3) = 1
        assert_abs_diff_eq!(manipulability_index(&jacobian), 1.0, epsilon = 1e-9);
        assert_eq!(manipulability_index(&Jacobian::default()), 0.0);
    }

    #[test]
    fn test_cancel_before_start() {
        let env = arm();
        let cancel = CancelToken::new();
        cancel.cancel();
        let request = SampleRequest::new("tool", 10);
        assert_eq!(
            WorkspaceSampler::new(&env).with_cancel(cancel).sample(&request),
            Err(SceneError::Cancelled)
        );
    }

    #[test]
    fn test_unusable_limits_fall_back() {
        let env = arm();
        let sampler = WorkspaceSampler::new(&env);
        for bad in [
            (f64::NEG_INFINITY, f64::INFINITY),
            (f64::NAN, 1.0),
            (0.0, f64::NAN),
            (-1e308, 1e308),
            (1.0, -1.0),
        ] {
            let limits = BTreeMap::from([("elbow".to_string(), bad)]);
            let request = SampleRequest::new("tool", 20)
                .with_joints(vec!["elbow".into()], limits)
                .with_continuous_range((-0.5, 0.5))
                .with_seed(Some(4));
            let samples = sampler.sample(&request).unwrap();
            assert_eq!(samples.len(), 20);
            for values in &samples.configurations {
                assert!(values["elbow"].is_finite());
                assert!(values["elbow"].abs() <= 0.5);
            }
        }
    }

    #[test]
    fn test_invalid_continuous_range() {
        let env = arm();
        let sampler = WorkspaceSampler::new(&env);
        let request = SampleRequest::for_environment(&env, "tool", 5, (-3.14, 3.14))
            .with_continuous_range((f64::NEG_INFINITY, 0.0));
        assert_eq!(
            sampler.sample(&request),
            Err(SceneError::InvalidSamplingRange {
                lo: f64::NEG_INFINITY,
                hi: 0.0
            })
        );
        let request = request.with_continuous_range((f64::NAN, 0.0));
        assert!(matches!(
            sampler.sample(&request),
            Err(SceneError::InvalidSamplingRange { .. })
        ));
    }

    #[test]
    fn test_fixed_range_uses_single_value() {
        let env = arm();
        let limits = BTreeMap::from([("shoulder".to_string(), (0.25, 0.25))]);
        let request = SampleRequest::new("tool", 3).with_joints(vec!["shoulder".into()], limits);
        let samples = WorkspaceSampler::new(&env).sample(&request).unwrap();
        assert!(samples.configurations.iter().all(|v| v["shoulder"] == 0.25));
    }

    #[test]
    fn test_spawned_job() {
        let env: Arc<dyn Environment> = Arc::new(arm());
        let request = SampleRequest::for_environment(env.as_ref(), "tool", 50, (-3.14, 3.14)).with_seed(Some(5));
        let job = WorkspaceSampler::spawn(env, request);
        let result = job.join().unwrap();
        assert_eq!(result.points().len(), 50);
        assert_eq!(result.scalars().len(), 50);
    }
}
