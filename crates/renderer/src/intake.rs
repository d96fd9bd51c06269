use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Sender};
use image::imageops::flip_vertical_in_place;
use image::RgbaImage;

/// An image decoded off the render thread, rows stored bottom-up ready for
/// upload.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub path: PathBuf,
    pub pixels: RgbaImage,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Result of one intake job.
#[derive(Debug)]
pub enum IntakeOutcome {
    Decoded(DecodedImage),
    Failed { path: PathBuf, error: String },
}

pub fn decode_image(path: &Path) -> Result<DecodedImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode image at {}", path.display()))?;
    let mut pixels = image.to_rgba8();
    flip_vertical_in_place(&mut pixels);
    Ok(DecodedImage {
        path: path.to_path_buf(),
        pixels,
    })
}

/// Background decoder. Jobs run in submission order on one worker; each
/// outcome is handed to the sink as soon as it is ready.
pub(crate) struct ImageIntake {
    jobs: Option<Sender<PathBuf>>,
    worker: Option<JoinHandle<()>>,
}

impl ImageIntake {
    pub fn spawn<F>(sink: F) -> Result<Self>
    where
        F: Fn(IntakeOutcome) + Send + 'static,
    {
        let (jobs_tx, jobs_rx) = unbounded::<PathBuf>();
        let worker = thread::Builder::new()
            .name("quadview-intake".into())
            .spawn(move || {
                for path in jobs_rx {
                    tracing::debug!(path = %path.display(), "decoding image");
                    let outcome = match decode_image(&path) {
                        Ok(image) => IntakeOutcome::Decoded(image),
                        Err(err) => IntakeOutcome::Failed {
                            path,
                            error: format!("{err:#}"),
                        },
                    };
                    sink(outcome);
                }
            })
            .map_err(|err| anyhow!("failed to spawn image intake thread: {err}"))?;

        Ok(Self {
            jobs: Some(jobs_tx),
            worker: Some(worker),
        })
    }

    pub fn submit(&self, path: PathBuf) {
        let Some(jobs) = &self.jobs else {
            return;
        };
        if let Err(err) = jobs.send(path) {
            tracing::warn!(path = %err.0.display(), "image intake worker has stopped; dropping image");
        }
    }
}

impl Drop for ImageIntake {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("image intake worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::time::Duration;

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let mut image = RgbaImage::from_pixel(3, 2, Rgba([0, 0, 255, 255]));
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let path = dir.join(name);
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn decode_flips_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "marker.png");
        let decoded = decode_image(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        // top-left marker ends up on the last row
        assert_eq!(decoded.pixels.get_pixel(0, 1), &Rgba([255, 0, 0, 255]));
        assert_eq!(decoded.pixels.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn decode_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = decode_image(&path).unwrap_err();
        assert!(format!("{err:#}").contains("notes.png"));
    }

    #[test]
    fn worker_reports_outcomes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_png(dir.path(), "good.png");
        let missing = dir.path().join("missing.png");

        let (tx, rx) = unbounded();
        let intake = ImageIntake::spawn(move |outcome| {
            let _ = tx.send(outcome);
        })
        .unwrap();
        intake.submit(good.clone());
        intake.submit(missing.clone());

        match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
            IntakeOutcome::Decoded(image) => assert_eq!(image.path, good),
            other => panic!("unexpected outcome: {other:?}"),
        }
        match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
            IntakeOutcome::Failed { path, error } => {
                assert_eq!(path, missing);
                assert!(!error.is_empty());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        drop(intake);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn dropping_after_worker_panic_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let intake = ImageIntake::spawn(|_| panic!("sink failure")).unwrap();
        intake.submit(dir.path().join("missing.png"));
        drop(intake);
    }
}
