//! End-to-end scenarios over synthetic catalogs

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDateTime, TimeDelta};

use crate::catalog::{build_catalog, list_source_files, Catalog, SourceFile};
use crate::checkpoint;
use crate::integration::fixtures::{
    at, export_config, recorder_name, recording, resolve_all, FakeTool, FixedProbe,
    RecordingProgress,
};
use crate::pipeline::{plan_episodes, CancelFlag, Exporter, NoProgress};
use crate::timeline::{Episode, Resolution};

/// Two recordings with a two second hole between them
fn gapped_pair() -> Catalog {
    Catalog::new(vec![
        recording("a.mp4", at(10, 0, 0), 30.0, 20.0),
        recording("b.mp4", at(10, 0, 32), 30.0, 20.0),
    ])
}

/// `count` recordings starting every `every` seconds
fn series(
    prefix: &str,
    first: NaiveDateTime,
    every: i64,
    count: i64,
    duration: f64,
    kill_offset: f64,
) -> Catalog {
    Catalog::new(
        (0..count)
            .map(|i| {
                let start = first + TimeDelta::seconds(every * i);
                recording(&format!("{}{}.mp4", prefix, i), start, duration, kill_offset)
            })
            .collect(),
    )
}

/// Check that segments and gaps tile the window and every kill is placed once
fn assert_complete(episode: &Episode, resolution: &Resolution) {
    let window = &resolution.window;
    let mut gaps = resolution.gaps.iter();
    let mut cursor = window.start;

    for segment in resolution.segments() {
        assert!(segment.start_time >= cursor, "segments overlap at {}", segment.start_time);
        assert!(segment.start_time >= segment.source.recording_start);
        assert!(segment.end_time <= segment.source.recording_end());
        if segment.start_time > cursor {
            let gap = gaps.next().expect("hole without a reported gap");
            assert_eq!((gap.start, gap.end), (cursor, segment.start_time));
        }
        cursor = segment.end_time;
    }
    if cursor < window.end {
        let gap = gaps.next().expect("missing trailing gap");
        assert_eq!((gap.start, gap.end), (cursor, window.end));
    }
    assert!(gaps.next().is_none());

    for kill in &episode.kill_times {
        let placed = resolution
            .segments()
            .iter()
            .filter(|s| s.kill_times.contains(kill))
            .count()
            + resolution.unassigned.iter().filter(|k| *k == kill).count();
        assert_eq!(placed, 1, "kill {} placed {} times", kill, placed);
    }
}

#[test]
fn test_three_recordings_one_episode() {
    let catalog = Catalog::new(vec![
        recording("a.mp4", at(9, 59, 45), 40.0, 20.0),
        recording("b.mp4", at(10, 0, 0), 40.0, 20.0),
        recording("c.mp4", at(10, 4, 40), 40.0, 20.0),
    ]);
    let mut config = export_config(&PathBuf::from("/tmp/unused"));
    config.grouping.threshold_secs = 10.0;

    let planned = plan_episodes(&catalog, &config);

    assert_eq!(planned.episodes.len(), 1);
    let episode = &planned.episodes[0];
    assert_eq!(episode.kill_count, 2);
    assert_eq!(episode.first_kill, at(10, 0, 5));
    assert_eq!(episode.window.start, at(9, 59, 55));
    assert_eq!(episode.window.end, at(10, 0, 25));
    assert!(episode.single_cover);

    assert_eq!(episode.clips.len(), 1);
    let clip = &episode.clips[0];
    assert_eq!(clip.source.display_name(), "a.mp4");
    assert_eq!(clip.cut_start_secs, 10.0);
    assert_eq!(clip.cut_duration_secs, 30.0);
    assert_eq!(clip.kill_count, 2);
}

#[test]
fn test_gap_exports_two_clips_and_concats() {
    let dir = tempfile::tempdir().unwrap();
    let config = export_config(dir.path());
    let planned = plan_episodes(&gapped_pair(), &config);
    assert_eq!(planned.episodes.len(), 1);
    assert_eq!(planned.episodes[0].gaps.len(), 1);
    assert_eq!(planned.episodes[0].gaps[0].duration_secs(), 2.0);

    let tool = FakeTool::new();
    let report = Exporter::new(&config, &tool, &NoProgress, CancelFlag::new()).run(&planned);

    let cuts = tool.cut_calls();
    assert_eq!(cuts.len(), 2);
    assert_eq!(cuts[0].source, "a.mp4");
    assert_eq!((cuts[0].offset, cuts[0].duration), (10.0, 20.0));
    assert_eq!(cuts[1].source, "b.mp4");
    assert_eq!((cuts[1].offset, cuts[1].duration), (0.0, 25.0));

    let temp = config.resolved_temp_dir();
    let concats = tool.concat_calls();
    assert_eq!(concats.len(), 1);
    assert_eq!(
        concats[0].0,
        vec![temp.join("temp_1_1_a.mp4"), temp.join("temp_1_2_b.mp4")]
    );

    let output = config.output_dir.join("killcount_20240618_100020_group1.mp4");
    assert_eq!(report.exported, 1);
    assert_eq!(report.outputs, vec![output.clone()]);
    assert!(output.exists());
    assert!(!temp.join("temp_1_1_a.mp4").exists());
    assert_eq!(report.checkpoint, Some(at(10, 0, 57)));
}

#[test]
fn test_boundary_kill_counted_once() {
    let catalog = Catalog::new(vec![
        recording("a.mp4", at(10, 0, 0), 30.0, 30.0),
        recording("b.mp4", at(10, 0, 30), 30.0, 20.0),
    ]);
    let config = export_config(&PathBuf::from("/tmp/unused"));

    let planned = plan_episodes(&catalog, &config);
    let clips = &planned.episodes[0].clips;

    assert_eq!(clips.len(), 2);
    assert_eq!(clips[0].source.display_name(), "a.mp4");
    assert_eq!(clips[0].kill_count, 1);
    assert_eq!(clips[0].segment_end, at(10, 0, 30));
    assert_eq!(clips[1].source.display_name(), "b.mp4");
    assert_eq!(clips[1].segment_start, at(10, 0, 30));
    assert_eq!(clips.iter().map(|c| c.kill_count).sum::<usize>(), 2);
}

#[test]
fn test_single_clip_is_moved_not_concatenated() {
    let dir = tempfile::tempdir().unwrap();
    let config = export_config(dir.path());
    let catalog = Catalog::new(vec![
        recording("long.mp4", at(10, 0, 0), 120.0, 20.0),
        recording("next.mp4", at(10, 0, 40), 40.0, 20.0),
    ]);
    let planned = plan_episodes(&catalog, &config);
    assert!(planned.episodes[0].single_cover);

    let tool = FakeTool::new();
    let report = Exporter::new(&config, &tool, &NoProgress, CancelFlag::new()).run(&planned);

    assert_eq!(tool.cut_calls().len(), 1);
    assert!(tool.concat_calls().is_empty());
    assert_eq!(report.exported, 1);
    assert!(report.outputs[0].exists());
    assert!(!config
        .resolved_temp_dir()
        .join("temp_1_1_long.mp4")
        .exists());
}

#[test]
fn test_resolution_tiles_window() {
    let mut config = export_config(&PathBuf::from("/tmp/unused"));
    config.grouping.min_kills = 1;

    // Overlapping recordings every 25s
    let dense = series("d", at(10, 0, 0), 25, 4, 40.0, 20.0);
    // 30s recordings every 35s
    let sparse = series("s", at(11, 0, 0), 35, 3, 30.0, 15.0);

    for catalog in [dense, sparse, gapped_pair()] {
        let resolved = resolve_all(&catalog, &config);
        assert_eq!(resolved.len(), 1);
        for (episode, resolution) in &resolved {
            assert_complete(episode, resolution);
        }
    }
}

#[test]
fn test_dense_overlap_hands_off_at_file_ends() {
    let mut config = export_config(&PathBuf::from("/tmp/unused"));
    config.grouping.min_kills = 1;
    let catalog = series("d", at(10, 0, 0), 25, 4, 40.0, 20.0);

    let resolved = resolve_all(&catalog, &config);
    let (_, resolution) = &resolved[0];
    let bounds: Vec<(NaiveDateTime, NaiveDateTime)> = resolution
        .segments()
        .iter()
        .map(|s| (s.start_time, s.end_time))
        .collect();

    assert_eq!(
        bounds,
        vec![
            (at(10, 0, 10), at(10, 0, 40)),
            (at(10, 0, 40), at(10, 1, 5)),
            (at(10, 1, 5), at(10, 1, 30)),
            (at(10, 1, 30), at(10, 1, 40)),
        ]
    );
    assert!(resolution.gaps.is_empty());
}

#[test]
fn test_failed_episode_does_not_stop_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = export_config(dir.path());
    let catalog = Catalog::new(vec![
        recording("a1.mp4", at(10, 0, 0), 40.0, 20.0),
        recording("a2.mp4", at(10, 0, 10), 40.0, 20.0),
        recording("b1.mp4", at(11, 0, 0), 40.0, 20.0),
        recording("b2.mp4", at(11, 0, 10), 40.0, 20.0),
    ]);
    let planned = plan_episodes(&catalog, &config);
    assert_eq!(planned.episodes.len(), 2);

    let tool = FakeTool::failing_on("a1.mp4");
    let report = Exporter::new(&config, &tool, &NoProgress, CancelFlag::new()).run(&planned);

    assert_eq!(report.failed, 1);
    assert_eq!(report.exported, 1);
    assert_eq!(
        report.outputs,
        vec![config.output_dir.join("killcount_20240618_110020_group1.mp4")]
    );
    assert_eq!(report.checkpoint, Some(at(11, 0, 35)));
}

#[test]
fn test_failed_cut_keeps_earlier_temp_clips() {
    let dir = tempfile::tempdir().unwrap();
    let config = export_config(dir.path());
    let planned = plan_episodes(&gapped_pair(), &config);

    let tool = FakeTool::failing_on("b.mp4");
    let report = Exporter::new(&config, &tool, &NoProgress, CancelFlag::new()).run(&planned);

    assert_eq!(report.failed, 1);
    assert_eq!(report.exported, 0);
    assert_eq!(report.checkpoint, None);
    assert!(tool.concat_calls().is_empty());
    assert!(config.resolved_temp_dir().join("temp_1_1_a.mp4").exists());
}

#[test]
fn test_failed_episode_temp_clips_survive_later_episodes() {
    let dir = tempfile::tempdir().unwrap();
    let config = export_config(dir.path());
    // Second episode cuts from a different recording that shares the file name
    let catalog = Catalog::new(vec![
        recording("a.mp4", at(10, 0, 0), 30.0, 20.0),
        recording("bad.mp4", at(10, 0, 32), 30.0, 20.0),
        SourceFile::new(PathBuf::from("/archive/a.mp4"), at(11, 0, 0), 40.0, 20.0),
        SourceFile::new(PathBuf::from("/archive/b.mp4"), at(11, 0, 10), 40.0, 20.0),
    ]);
    let planned = plan_episodes(&catalog, &config);
    assert_eq!(planned.episodes.len(), 2);

    let tool = FakeTool::failing_on("bad.mp4");
    let report = Exporter::new(&config, &tool, &NoProgress, CancelFlag::new()).run(&planned);

    assert_eq!(report.failed, 1);
    assert_eq!(
        report.outputs,
        vec![config.output_dir.join("killcount_20240618_110020_group1.mp4")]
    );
    let temp = config.resolved_temp_dir();
    let outputs: Vec<PathBuf> = tool.cut_calls().into_iter().map(|c| c.output).collect();
    assert_eq!(
        outputs,
        vec![
            temp.join("temp_1_1_a.mp4"),
            temp.join("temp_1_2_bad.mp4"),
            temp.join("temp_2_1_a.mp4"),
        ]
    );
    assert!(temp.join("temp_1_1_a.mp4").exists());
}

#[test]
fn test_cancel_before_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = export_config(dir.path());
    let planned = plan_episodes(&gapped_pair(), &config);

    let cancel = CancelFlag::new();
    cancel.cancel();
    let tool = FakeTool::new();
    let report = Exporter::new(&config, &tool, &NoProgress, cancel).run(&planned);

    assert!(report.cancelled);
    assert_eq!(report.exported, 0);
    assert_eq!(report.checkpoint, None);
    assert!(tool.cut_calls().is_empty());
}

#[test]
fn test_cancel_between_clips() {
    let dir = tempfile::tempdir().unwrap();
    let config = export_config(dir.path());
    let planned = plan_episodes(&gapped_pair(), &config);

    let cancel = CancelFlag::new();
    let tool = FakeTool::cancelling_after(1, cancel.clone());
    let report = Exporter::new(&config, &tool, &NoProgress, cancel).run(&planned);

    assert!(report.cancelled);
    assert_eq!(tool.cut_calls().len(), 1);
    assert!(tool.concat_calls().is_empty());
    assert!(report.outputs.is_empty());
    assert_eq!(report.checkpoint, None);
    assert!(config.resolved_temp_dir().join("temp_1_1_a.mp4").exists());
}

#[test]
fn test_output_names_are_unique() {
    let dir = tempfile::tempdir().unwrap();
    let config = export_config(dir.path());
    let mut files = Vec::new();
    for hour in [10, 11, 12] {
        files.push(recording(&format!("{}a.mp4", hour), at(hour, 0, 0), 40.0, 20.0));
        files.push(recording(&format!("{}b.mp4", hour), at(hour, 0, 10), 40.0, 20.0));
    }
    let planned = plan_episodes(&Catalog::new(files), &config);

    let tool = FakeTool::new();
    let report = Exporter::new(&config, &tool, &NoProgress, CancelFlag::new()).run(&planned);

    let names: Vec<String> = report
        .outputs
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "killcount_20240618_100020_group1.mp4",
            "killcount_20240618_110020_group2.mp4",
            "killcount_20240618_120020_group3.mp4",
        ]
    );
    assert_eq!(report.checkpoint, Some(at(12, 0, 35)));
}

#[test]
fn test_progress_reported_per_episode_and_clip() {
    let dir = tempfile::tempdir().unwrap();
    let config = export_config(dir.path());
    let planned = plan_episodes(&gapped_pair(), &config);

    let progress = RecordingProgress::default();
    Exporter::new(&config, &FakeTool::new(), &progress, CancelFlag::new()).run(&planned);

    let reports = progress.0.lock().unwrap().clone();
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|(i, total, _)| (*i, *total) == (1, 1)));
    assert!(reports[0].2.starts_with("episode at"));
    assert_eq!(reports[1].2, "clip 1/2 from a.mp4");
    assert_eq!(reports[2].2, "clip 2/2 from b.mp4");
}

#[test]
fn test_checkpoint_skips_processed_recordings() {
    let dir = tempfile::tempdir().unwrap();
    let config = export_config(dir.path());
    fs::create_dir_all(&config.input_dir).unwrap();

    let mut durations = HashMap::new();
    let add = |durations: &mut HashMap<String, f64>, start: NaiveDateTime| {
        let name = recorder_name(start);
        fs::write(config.input_dir.join(&name), b"replay").unwrap();
        durations.insert(name, 40.0);
    };
    add(&mut durations, at(10, 0, 0));
    add(&mut durations, at(10, 0, 15));

    let run = |probe: &FixedProbe| {
        let entries = list_source_files(&config.input_dir, &config.source_extension).unwrap();
        let scan = build_catalog(
            &entries,
            probe,
            checkpoint::load(&config.state_file),
            &config.padding,
        );
        let planned = plan_episodes(&scan.catalog, &config);
        let report =
            Exporter::new(&config, &FakeTool::new(), &NoProgress, CancelFlag::new()).run(&planned);
        if let Some(done) = report.checkpoint {
            checkpoint::save(&config.state_file, done).unwrap();
        }
        (scan, report)
    };

    let (_, first) = run(&FixedProbe(durations.clone()));
    assert_eq!(first.exported, 1);
    assert_eq!(first.checkpoint, Some(at(10, 0, 40)));

    add(&mut durations, at(10, 30, 0));
    add(&mut durations, at(10, 30, 10));
    let (scan, second) = run(&FixedProbe(durations));

    assert_eq!(scan.skipped_checkpoint, 2);
    assert_eq!(scan.catalog.len(), 2);
    assert_eq!(
        second.outputs,
        vec![config.output_dir.join("killcount_20240618_103020_group1.mp4")]
    );
    assert_eq!(checkpoint::load(&config.state_file), Some(at(10, 30, 35)));
}

#[test]
fn test_planned_run_serializes() {
    let config = export_config(&PathBuf::from("/tmp/unused"));
    let planned = plan_episodes(&gapped_pair(), &config);

    let json = serde_json::to_value(&planned).unwrap();
    let episode = &json["episodes"][0];
    assert_eq!(episode["kill_count"], 2);
    assert_eq!(episode["first_kill"], "2024-06-18T10:00:20");
    assert_eq!(episode["clips"][1]["cut_duration_secs"], 25.0);
    assert_eq!(episode["gaps"][0]["start"], "2024-06-18T10:00:30");
    assert_eq!(json["skipped"], 0);
}
