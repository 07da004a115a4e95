/// Units of work a percent-tracked task reports in total.
pub const TOTAL_WORK: u32 = 100;

const MEGABYTE: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A task has started. `total` is `None` when the amount of work is unknown.
    Begin { task: String, total: Option<u32> },
    /// `worked` more units are done.
    Worked { worked: u32, label: String },
    /// Progress without a known total, only the label changes.
    Label(String),
}

#[async_trait::async_trait]
pub trait ProgressSender<P: Send>: Sync + Send {
    /// It can technically return error but we will ignore them.
    async fn update(&self, data: P);
}

#[async_trait::async_trait]
impl<P: Send> ProgressSender<P> for tokio::sync::mpsc::Sender<P> {
    async fn update(&self, data: P) {
        let _ = self.send(data).await;
    }
}

#[async_trait::async_trait]
impl<P: Send> ProgressSender<P> for tokio::sync::mpsc::UnboundedSender<P> {
    async fn update(&self, data: P) {
        let _ = self.send(data);
    }
}

#[async_trait::async_trait]
impl<P: Send> ProgressSender<P> for std::sync::mpsc::Sender<P> {
    async fn update(&self, data: P) {
        let _ = self.send(data);
    }
}

/// `ProgressSender` that drops every update.
pub struct IgnoreProgress;

#[async_trait::async_trait]
impl<P: Send + 'static> ProgressSender<P> for IgnoreProgress {
    async fn update(&self, _data: P) {}
}

/// Byte accounting of a single download.
///
/// `downloaded_bytes` and `percent_complete` never decrease and the percentage
/// never exceeds [`TOTAL_WORK`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    total_bytes: Option<u64>,
    downloaded_bytes: u64,
    percent_complete: u32,
}

impl ProgressState {
    /// A zero or missing length means the size is unknown.
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self {
            total_bytes: total_bytes.filter(|total| *total > 0),
            downloaded_bytes: 0,
            percent_complete: 0,
        }
    }

    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes
    }

    pub fn percent_complete(&self) -> u32 {
        self.percent_complete
    }

    pub fn is_indeterminate(&self) -> bool {
        self.total_bytes.is_none()
    }

    /// Records `bytes` more bytes and returns how many whole percent were gained.
    ///
    /// Returns `None` when the percentage did not move or the total is unknown.
    pub fn advance(&mut self, bytes: usize) -> Option<u32> {
        self.downloaded_bytes += bytes as u64;

        let total = self.total_bytes?;
        let percent = (u128::from(self.downloaded_bytes) * u128::from(TOTAL_WORK) / u128::from(total))
            .min(u128::from(TOTAL_WORK)) as u32;

        if percent > self.percent_complete {
            let delta = percent - self.percent_complete;
            self.percent_complete = percent;
            Some(delta)
        } else {
            None
        }
    }

    /// `"X MB/Y MB"`, or just `"X MB"` when the total is unknown.
    pub fn label(&self) -> String {
        match self.total_bytes {
            Some(total) => format!(
                "{}/{}",
                convert_to_mb(self.downloaded_bytes),
                convert_to_mb(total)
            ),
            None => convert_to_mb(self.downloaded_bytes),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn convert_to_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / MEGABYTE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_test() {
        let (sender, _) = std::sync::mpsc::channel::<ProgressEvent>();
        let _: Box<dyn ProgressSender<ProgressEvent>> = Box::new(sender);

        let (sender, _) = tokio::sync::mpsc::channel::<ProgressEvent>(1);
        let _: Box<dyn ProgressSender<ProgressEvent>> = Box::new(sender);

        let _: Box<dyn ProgressSender<ProgressEvent>> = Box::new(IgnoreProgress);
    }

    #[test]
    fn convert_to_mb_test() {
        assert_eq!(convert_to_mb(0), "0.00 MB");
        assert_eq!(convert_to_mb(1024 * 1024), "1.00 MB");
        assert_eq!(convert_to_mb(1536 * 1024), "1.50 MB");
    }

    #[test]
    fn advance_accumulates_exact_bytes_test() {
        for total in [1_u64, 100, 4095, 4096, 4097, 10_000, 1_000_003] {
            for chunk in [1_usize, 7, 512, 4096, 65536] {
                let mut state = ProgressState::new(Some(total));
                let mut previous = 0;
                let mut worked = 0;
                let mut remaining = total;

                while remaining > 0 {
                    let read = remaining.min(chunk as u64);
                    remaining -= read;
                    if let Some(delta) = state.advance(read as usize) {
                        worked += delta;
                    }
                    assert!(state.percent_complete() >= previous);
                    assert!(state.percent_complete() <= TOTAL_WORK);
                    previous = state.percent_complete();
                }

                assert_eq!(state.downloaded_bytes(), total);
                assert_eq!(state.percent_complete(), TOTAL_WORK);
                assert_eq!(worked, TOTAL_WORK);
            }
        }
    }

    #[test]
    fn short_final_chunk_does_not_overshoot_test() {
        let mut state = ProgressState::new(Some(5000));
        assert_eq!(state.advance(4096), Some(81));
        assert_eq!(state.advance(904), Some(19));
        assert_eq!(state.percent_complete(), 100);
    }

    #[test]
    fn unknown_length_test() {
        let mut state = ProgressState::new(Some(0));
        assert!(state.is_indeterminate());
        assert_eq!(state.advance(4096), None);
        assert_eq!(state.downloaded_bytes(), 4096);
        assert_eq!(state.percent_complete(), 0);
        assert_eq!(state.label(), "0.00 MB");

        let state = ProgressState::new(None);
        assert!(state.is_indeterminate());
    }

    #[test]
    fn label_test() {
        let mut state = ProgressState::new(Some(2 * 1024 * 1024));
        state.advance(1024 * 1024);
        assert_eq!(state.label(), "1.00 MB/2.00 MB");
    }
}
