mod common;

use std::path::Path;

use auris::error::VerifyError;
use auris::voice_auth::{VerificationGate, VoiceProfile};
use common::*;

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(value).unwrap();
        }
    }
    writer.finalize().unwrap();
}

/// The synthetic speaker resampled to another rate, so the WAV path has
/// real work to do.
fn voice_at_rate(seed: u64, f0: f32, rate: u32) -> Vec<f32> {
    let base = synthetic_voice(seed, f0);
    let ratio = rate as f32 / SAMPLE_RATE as f32;
    let len = (base.len() as f32 * ratio) as usize;
    (0..len)
        .map(|i| base[((i as f32 / ratio) as usize).min(base.len() - 1)])
        .collect()
}

#[test]
fn test_enrolled_speaker_accepted_impostor_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let gate = enrolled_gate(&dir.path().join("profile.json"));
    assert!(gate.has_profile());

    let genuine = gate.verify(&synthetic_voice(42, 142.0)).unwrap();
    assert!(genuine.accepted, "enrolled voice should pass (score {:.3})", genuine.score);
    assert!(genuine.score >= genuine.threshold);

    let impostor = gate.verify(&impostor_sample(43)).unwrap();
    assert!(!impostor.accepted, "noise should be rejected (score {:.3})", impostor.score);

    println!("Test Verify Passed");
}

#[test]
fn test_silence_scores_low_and_never_errors() {
    let dir = tempfile::tempdir().unwrap();
    let gate = enrolled_gate(&dir.path().join("profile.json"));

    let empty = gate.verify(&[]).unwrap();
    assert!(!empty.accepted);
    assert!((0.0..=1.0).contains(&empty.score));

    let silent = gate.verify(&vec![0.0; SAMPLE_RATE * 2]).unwrap();
    assert!(!silent.accepted);
}

#[test]
fn test_missing_profile_reports_artifact_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let gate = VerificationGate::new(&path, 0.55);

    assert!(!gate.has_profile());
    match gate.verify(&synthetic_voice(1, 140.0)) {
        Err(VerifyError::ArtifactMissing(missing)) => assert_eq!(missing, path),
        other => panic!("expected ArtifactMissing, got {:?}", other),
    }
}

#[test]
fn test_enroll_without_samples_fails() {
    let dir = tempfile::tempdir().unwrap();
    let gate = VerificationGate::new(dir.path().join("profile.json"), 0.55);

    assert!(matches!(gate.enroll(&[]), Err(VerifyError::NoSamples)));
    assert!(!gate.has_profile(), "failed enrollment must not write a profile");
}

#[test]
fn test_profile_persists_and_rejects_other_versions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.json");
    let gate = enrolled_gate(&path);

    let loaded = VoiceProfile::load(&path).unwrap();
    let again = VoiceProfile::load(gate.model_path()).unwrap();
    assert_eq!(loaded, again);
    assert!(!path.with_extension("json.tmp").exists(), "temp file should be renamed away");

    let mut future = loaded.clone();
    future.version = 99;
    future.save(&path).unwrap();
    assert!(matches!(VoiceProfile::load(&path), Err(VerifyError::Incompatible(_))));
}

#[test]
fn test_enroll_from_stereo_wavs_at_other_rate() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    for (i, f0) in [132.0, 138.0, 144.0, 150.0].iter().enumerate() {
        let path = dir.path().join(format!("sample_{}.wav", i));
        write_wav(&path, &voice_at_rate(i as u64 + 10, *f0, 44_100), 44_100, 2);
        paths.push(path);
    }
    // Unreadable files are skipped, not fatal.
    let bogus = dir.path().join("bogus.wav");
    std::fs::write(&bogus, b"not a wav").unwrap();
    paths.push(bogus);

    let gate = VerificationGate::new(dir.path().join("profile.json"), 0.55);
    gate.enroll_from_wavs(&paths).unwrap();
    assert!(gate.has_profile());

    let verdict = gate.verify(&synthetic_voice(77, 141.0)).unwrap();
    assert!(verdict.accepted, "same speaker should pass after WAV enrollment (score {:.3})", verdict.score);

    println!("Test WAV Enrollment Passed");
}
