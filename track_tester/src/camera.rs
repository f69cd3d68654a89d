use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, bail};
use hue_tracker::{ChannelOrder, Frame, FrameSource, SourceError, StopSignal, TimedFrame};
use opencv::{
    core::{self, Mat, Scalar},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

const WINDOW: &str = "track_tester";
const KEY_ESC: i32 = 27;

/// Frames from an OpenCV capture device or video file, optionally mirrored to a
/// preview window that doubles as the interrupt key listener.
pub struct CameraFeed {
    capture: VideoCapture,
    started: Instant,
    preview: bool,
    interrupted: Rc<Cell<bool>>,
}

impl CameraFeed {
    /// Opens `input` as a camera index when it parses as one, otherwise as a file.
    pub fn open(input: &str, preview: bool) -> anyhow::Result<Self> {
        let capture = match input.parse::<i32>() {
            Ok(index) => VideoCapture::new(index, videoio::CAP_ANY),
            Err(_) => VideoCapture::from_file(input, videoio::CAP_ANY),
        }
        .with_context(|| format!("failed to open video input {input}"))?;
        if !capture.is_opened()? {
            bail!("video input {input} could not be opened");
        }
        if preview {
            highgui::named_window(WINDOW, highgui::WINDOW_AUTOSIZE)?;
        }
        Ok(Self {
            capture,
            started: Instant::now(),
            preview,
            interrupted: Rc::new(Cell::new(false)),
        })
    }

    /// Stop signal raised when `q` or Esc is pressed in the preview window.
    pub fn interrupt_key(&self) -> KeyInterrupt {
        KeyInterrupt(self.interrupted.clone())
    }

    fn grab(&mut self) -> opencv::Result<Option<Mat>> {
        let mut raw = Mat::default();
        if !self.capture.read(&mut raw)? || raw.empty() {
            return Ok(None);
        }
        // Some cameras deliver grayscale; the tracker wants color.
        let frame = if raw.channels() == 1 {
            let mut bgr = Mat::default();
            imgproc::cvt_color(&raw, &mut bgr, imgproc::COLOR_GRAY2BGR, 0)?;
            bgr
        } else if raw.is_continuous() {
            raw
        } else {
            raw.try_clone()?
        };
        Ok(Some(frame))
    }

    fn show(&self, mat: &Mat) -> opencv::Result<()> {
        let mut display = mat.try_clone()?;
        let center = core::Point::new(mat.cols() / 2, mat.rows() / 2);
        imgproc::circle(
            &mut display,
            center,
            6,
            Scalar::new(0.0, 0.0, 255.0, 0.0),
            2,
            imgproc::LINE_8,
            0,
        )?;
        highgui::imshow(WINDOW, &display)?;

        let key = highgui::wait_key(1)?;
        if key == i32::from(b'q') || key == KEY_ESC {
            self.interrupted.set(true);
        }
        Ok(())
    }
}

impl FrameSource for CameraFeed {
    fn next_frame(&mut self) -> Result<Option<TimedFrame>, SourceError> {
        let acquisition = |err: opencv::Error| SourceError::Acquisition(err.to_string());

        let Some(mat) = self.grab().map_err(acquisition)? else {
            return Ok(None);
        };
        let timestamp = self.started.elapsed();
        if self.preview {
            self.show(&mat).map_err(acquisition)?;
        }

        let data = mat.data_bytes().map_err(acquisition)?.to_vec();
        let frame = Frame::new(
            mat.cols() as u32,
            mat.rows() as u32,
            mat.channels() as usize,
            ChannelOrder::Bgr,
            data,
        )?;
        Ok(Some(TimedFrame { frame, timestamp }))
    }
}

impl Drop for CameraFeed {
    fn drop(&mut self) {
        if self.preview {
            let _ = highgui::destroy_all_windows();
        }
    }
}

pub struct KeyInterrupt(Rc<Cell<bool>>);

impl StopSignal for KeyInterrupt {
    fn should_stop(&mut self) -> bool {
        self.0.get()
    }
}
