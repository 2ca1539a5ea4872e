use livemerge_core::dashboard::DashboardOptions;
use livemerge_core::store::{keys, Store};
use livemerge_core::{Dashboard, SortMode, UserPreferences};

fn open(dir: &std::path::Path) -> Dashboard {
    Dashboard::open(&Store::on_disk(dir), DashboardOptions::default())
}

#[test]
fn dashboard_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (kept, removed) = {
        let mut dash = open(dir.path());
        let kept = dash.add_stream("Zeta", "https://www.youtube.com/watch?v=z1").unwrap();
        let removed = dash.add_stream("Alpha", "https://youtu.be/a1").unwrap();
        dash.add_stream("Mid", "https://www.youtube.com/live/m1").unwrap();
        dash.follow_channel("UCfollowed").unwrap();
        dash.set_sort_mode(SortMode::TitleAsc);
        dash.save_preferences(&UserPreferences {
            display_name: "Viewer".into(),
            favorite_category: String::new(),
            auto_join: false,
        });
        dash.set_token("tok", i64::MAX);
        assert!(dash.remove_stream(&removed.id));
        (kept, removed)
    };

    let mut dash = open(dir.path());
    let titles: Vec<_> = dash.ordered_streams(None).iter().map(|s| s.title().to_string()).collect();
    assert_eq!(titles, ["Mid", "Zeta"]);
    assert_eq!(dash.sort_mode(), SortMode::TitleAsc);
    assert_eq!(dash.channels(), ["UCfollowed".to_string()]);
    assert_eq!(dash.preferences().display_name, "Viewer");
    assert!(dash.is_signed_in());
    assert!(dash.stream(&kept.id).is_some());
    assert!(!dash.custom_order().contains(&removed.id));
}

#[test]
fn corrupt_files_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(format!("{}.json", keys::STREAMS.name())), "{not json").unwrap();
    std::fs::write(dir.path().join(format!("{}.json", keys::SORT_MODE.name())), "\"sideways\"").unwrap();

    let mut dash = open(dir.path());
    assert!(dash.streams().is_empty());
    assert_eq!(dash.sort_mode(), SortMode::Default);

    // The next write replaces the broken file.
    dash.add_stream("Fresh", "https://youtu.be/f1").unwrap();
    assert_eq!(open(dir.path()).streams().len(), 1);
}

#[test]
fn custom_order_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut dash = open(dir.path());
    let a = dash.add_stream("A", "https://youtu.be/a").unwrap();
    let b = dash.add_stream("B", "https://youtu.be/b").unwrap();
    let c = dash.add_stream("C", "https://youtu.be/c").unwrap();

    let order = livemerge_core::sort::move_in_order(dash.custom_order(), 2, -1);
    dash.apply_custom_sort(&order, SortMode::Custom);

    let reopened = open(dir.path());
    assert_eq!(reopened.custom_order(), [a.id, c.id, b.id]);
    assert_eq!(reopened.sort_mode(), SortMode::Custom);
}
