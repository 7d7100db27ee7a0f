//! Time-tag conversion round-trip tests (spec §8.2 S6).

use cosc::TimeTag;

#[test]
fn s6_time_tag_round_trip() {
    let mut ns = 0u32;
    while ns < 1_000_000_000 {
        let tag = TimeTag::from_time(0, ns);
        assert_eq!(tag.to_time(), (0, ns), "ns = {ns}");
        ns += 100_000;
    }

    assert_eq!(TimeTag::from_time(0, 500_000_000).as_u64(), 0x0000_0000_8000_0000);
}
