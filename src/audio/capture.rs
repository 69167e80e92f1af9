use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use std::time::Duration;
use tracing::{error, info};

use super::processing::{resample, to_mono};
use crate::error::AudioError;
use crate::kernel::devices::SampleRecorder;
use crate::voice_auth::features::SAMPLE_RATE;

/// Records fixed-length clips from an input device for verification and
/// enrollment. The stream only exists for the duration of one clip.
pub struct MicRecorder {
    device_name: Option<String>,
}

impl MicRecorder {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }
}

#[async_trait]
impl SampleRecorder for MicRecorder {
    async fn record(&self, seconds: f32) -> Result<Vec<f32>, AudioError> {
        let device_name = self.device_name.clone();
        tokio::task::spawn_blocking(move || record_blocking(device_name.as_deref(), seconds))
            .await
            .map_err(|e| AudioError::Capture(e.to_string()))?
    }
}

fn device_error<E: std::fmt::Display>(e: E) -> AudioError {
    AudioError::Device(e.to_string())
}

fn record_blocking(device_name: Option<&str>, seconds: f32) -> Result<Vec<f32>, AudioError> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .input_devices()
            .map_err(device_error)?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AudioError::Device(format!("no input device named '{}'", name)))?,
        None => host
            .default_input_device()
            .ok_or_else(|| AudioError::Device("no input device available".to_string()))?,
    };

    let config = device.default_input_config().map_err(device_error)?;
    let rate = config.sample_rate().0;
    let channels = config.channels();
    info!(
        "Recording {:.1}s from {} ({}Hz, {} ch)",
        seconds,
        device.name().unwrap_or_default(),
        rate,
        channels
    );

    let seconds = seconds.max(0.1);
    let capacity = ((rate as f32 * seconds) as usize + rate as usize) * channels as usize;
    let (mut producer, mut consumer) = HeapRb::<f32>::new(capacity).split();

    let err_fn = |err| error!("an error occurred on input stream: {}", err);

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config.config(),
            move |data: &[f32], _: &_| {
                producer.push_slice(data);
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config.config(),
            move |data: &[i16], _: &_| {
                for &sample in data {
                    let _ = producer.try_push(sample as f32 / i16::MAX as f32);
                }
            },
            err_fn,
            None,
        ),
        other => {
            return Err(AudioError::Device(format!("unsupported sample format {:?}", other)));
        }
    }
    .map_err(device_error)?;

    stream.play().map_err(device_error)?;
    std::thread::sleep(Duration::from_secs_f32(seconds));
    drop(stream);

    let mut interleaved = vec![0.0f32; consumer.occupied_len()];
    let read = consumer.pop_slice(&mut interleaved);
    interleaved.truncate(read);

    resample(to_mono(&interleaved, channels), rate, SAMPLE_RATE)
}
