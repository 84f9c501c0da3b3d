use proptest::prelude::*;

use subalign::align::{self, AlignOptions, MatchKind, completeness, search};
use subalign::review;
use subalign::srt::{self, Cue, FormatError};
use subalign::text::{ManualBreak, normalize_script, wrap_chunk};

const SCRIPT: &str = "\
# 第三集

[旁白] 今天天气很好，我们出去玩吧！
[小明 00:12] 你想去哪里呢？

[小红] 去公园看花吗？
";

const SUBTITLES: &str = "\
1
00:00:01,000 --> 00:00:03,200
<b>今天天汽很好，
我们出去玩吧</b>

2
00:00:03,200 --> 00:00:04,500
<b>你想去那里</b>

3
00:00:05,000 --> 00:00:06,000
<b>去公园看花</b>
";

fn sequential() -> AlignOptions {
    AlignOptions {
        parallel: false,
        ..Default::default()
    }
}

#[test]
fn test_exact_substring_scenario() {
    let result = search("今天天气很好", "今天天气很好我们出去玩吧");
    assert_eq!(result.candidate, "今天天气很好");
    assert_eq!(result.kind, MatchKind::Exact);
}

#[test]
fn test_single_line_cue_scenario() {
    let cue = Cue::new(1, "00:00:01,000", "00:00:02,000", vec!["你好吗".into()]);
    assert_eq!(cue.line_count(), 1);
    assert_eq!(wrap_chunk("你好吗", cue.line_count(), None), vec!["<b>你好吗</b>"]);
}

#[test]
fn test_comma_snap_scenario() {
    let cues = vec![
        Cue::new(1, "00:00:01,000", "00:00:02,000", vec!["甲".into(), "乙".into()]),
        Cue::new(2, "00:00:02,000", "00:00:03,000", vec!["丙".into(), "丁".into()]),
    ];
    let chunks = vec!["今天天气好，我们去玩".to_string(), "一二三四五六七八九十".to_string()];
    let out = srt::format_srt(&cues, &chunks, None).unwrap();
    assert_eq!(
        out,
        "1\n00:00:01,000 --> 00:00:02,000\n<b>今天天气好，\n我们去玩</b>\n\n\
         2\n00:00:02,000 --> 00:00:03,000\n<b>一二三四五\n六七八九十</b>\n"
    );
}

#[test]
fn test_completeness_boundaries() {
    for text in ["你", "今天天气很好", "abc，def"] {
        assert_eq!(completeness(text, text), 1.0);
        assert_eq!(completeness(text, ""), 0.0);
    }
}

#[test]
fn test_manual_override_ignores_chunk() {
    let manual = ManualBreak::new(["第一行", "第二行", "第三行"]);
    let lines = wrap_chunk("这些文字不会出现", 3, Some(&manual));
    assert_eq!(lines, vec!["<b>第一行", "第二行", "第三行</b>"]);
}

#[test]
fn test_format_rejects_count_mismatch() {
    let cues = srt::parse_srt(SUBTITLES).unwrap();
    let err = srt::format_srt(&cues, &[], None).unwrap_err();
    assert_eq!(err, FormatError::CountMismatch { cues: 3, chunks: 0 });
}

#[test]
fn test_reference_normalization() {
    assert_eq!(
        normalize_script(SCRIPT),
        "今天天气很好，我们出去玩吧！ 你想去哪里呢？ 去公园看花吗？"
    );
}

#[test]
fn test_end_to_end_correction() {
    let out = align::correct_document(SUBTITLES, SCRIPT, sequential()).unwrap();
    let cues = srt::parse_srt(&out).unwrap();

    assert_eq!(cues.len(), 3);
    assert_eq!(cues[0].text_lines, vec!["<b>今天天气很好，", "我们出去玩吧</b>"]);
    assert_eq!(cues[1].plain_text(), "你想去哪里");
    assert_eq!(cues[2].plain_text(), "去公园看花");
    assert_eq!(cues[1].start, "00:00:03,200");
}

#[test]
fn test_parallel_and_sequential_agree() {
    let cues = srt::parse_srt(SUBTITLES).unwrap();
    let corpus = normalize_script(SCRIPT);
    assert_eq!(
        align::align_cues(&cues, &corpus, sequential()),
        align::align_cues(&cues, &corpus, AlignOptions::default())
    );
}

#[test]
fn test_review_round_trip() {
    let cues = srt::parse_srt(SUBTITLES).unwrap();
    let corpus = normalize_script(SCRIPT);
    let chunks = align::align_cues(&cues, &corpus, sequential());

    let mut entries = review::build_review(&cues, &chunks).unwrap();
    entries[0].corrected_text = "今天天气真好，\n我们出去玩吧".to_string();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("review.json");
    review::save_review(&path, &entries).unwrap();
    let out = review::apply_review(&review::load_review(&path).unwrap()).unwrap();

    assert!(out.starts_with("1\n00:00:01,000 --> 00:00:03,200\n<b>今天天气真好，\n我们出去玩吧</b>\n\n"));
    assert_eq!(srt::parse_srt(&out).unwrap().len(), 3);
}

fn timestamp() -> impl Strategy<Value = String> {
    (0u32..100, 0u32..60, 0u32..60, 0u32..1000)
        .prop_map(|(h, m, s, ms)| format!("{h:02}:{m:02}:{s:02},{ms:03}"))
}

fn cue() -> impl Strategy<Value = Cue> {
    (
        1..=u64::MAX,
        timestamp(),
        timestamp(),
        prop::collection::vec("[a-z甲乙丙]{1,6}", 1..5),
    )
        .prop_map(|(index, start, end, lines)| Cue::new(index, start, end, lines))
}

proptest! {
    #[test]
    fn prop_format_then_parse_keeps_cue_metadata(
        (cues, chunks) in prop::collection::vec(cue(), 0..8).prop_flat_map(|cues| {
            let n = cues.len();
            (
                Just(cues),
                prop::collection::vec("[a-z甲乙丙，。！ \n]{0,24}", n),
            )
        })
    ) {
        let document = srt::format_srt(&cues, &chunks, None).unwrap();
        let parsed = srt::parse_srt(&document).unwrap();

        prop_assert_eq!(parsed.len(), cues.len());
        for (before, after) in cues.iter().zip(&parsed) {
            prop_assert_eq!(before.index, after.index);
            prop_assert_eq!(&before.start, &after.start);
            prop_assert_eq!(&before.end, &after.end);
            prop_assert_eq!(before.line_count(), after.line_count());
        }
        prop_assert!(document.ends_with('\n'));
        prop_assert!(!document.ends_with("\n\n") || cues.is_empty());
    }

    #[test]
    fn prop_verbatim_targets_are_found_exactly(
        corpus in "[甲乙丙丁戊，。]{1,40}",
        start in 0usize..40,
        len in 1usize..10,
    ) {
        let chars: Vec<char> = corpus.chars().collect();
        let start = start % chars.len();
        let end = (start + len).min(chars.len());
        let target: String = chars[start..end].iter().collect();

        let result = search(&target, &corpus);
        prop_assert_eq!(result.kind, MatchKind::Exact);
        prop_assert_eq!(result.candidate, target);
    }
}
