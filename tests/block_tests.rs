//! Integration tests for shared memory blocks

use serde::{Deserialize, Serialize};
use shmblock::{
    BlockConfig, BlockState, FramingMode, SerialFormat, ShmError, SharedMemoryBlock, TextEncoding,
};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GpioDescriptor {
    name: String,
    pin: u16,
    direction: String,
    inverted: bool,
}

fn gpio() -> GpioDescriptor {
    GpioDescriptor {
        name: "POWER_BUTTON".to_string(),
        pin: 34,
        direction: "falling".to_string(),
        inverted: false,
    }
}

fn open(config: BlockConfig, dir: &TempDir, file: &str) -> SharedMemoryBlock {
    let mut block = SharedMemoryBlock::new(config).unwrap();
    block.create(dir.path(), "/org/openbmc/test", file, "").unwrap();
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminated_text_round_trip_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let config = BlockConfig::new(8)
            .with_mode(FramingMode::Terminated)
            .with_encoding(TextEncoding::Utf8)
            .with_fill_char(' ');
        let mut block = open(config, &temp_dir, "hello");

        block.write("hello", 0).unwrap();
        assert_eq!(block.read(0, 0).unwrap(), "hello");

        block.clear(0).unwrap();
        assert_eq!(block.read(0, 0).unwrap(), "");

        // Clearing twice changes nothing
        block.clear(0).unwrap();
        assert_eq!(block.read(0, 0).unwrap(), "");
        block.close().unwrap();
    }

    #[test]
    fn test_fixed_length_reads_by_slot() {
        let temp_dir = TempDir::new().unwrap();
        let mut block = open(BlockConfig::new(4).fixed_length(), &temp_dir, "slots");
        assert_eq!(block.char_width(), 4);
        assert_eq!(block.mapped_len(), Some(16));

        block.write("ab", 0).unwrap();
        assert_eq!(block.read(2, 0).unwrap(), "ab");

        block.clear(0).unwrap();
        block.write("ab", 0).unwrap();
        assert_eq!(block.read(2, 0).unwrap(), "ab");
        assert_eq!(block.read(1, 1).unwrap(), " ");
        block.close().unwrap();
    }

    #[test]
    fn test_fixed_length_multibyte_characters() {
        let temp_dir = TempDir::new().unwrap();
        let mut block = open(BlockConfig::new(4).fixed_length(), &temp_dir, "wide");
        block.clear(0).unwrap();
        block.write("€€€€", 0).unwrap();
        assert_eq!(block.read(4, 0).unwrap(), "€€€€");
        // A span ending inside a character drops the partial character
        assert_eq!(block.read(1, 0).unwrap(), "€");
        block.close().unwrap();
    }

    #[test]
    fn test_fixed_length_clear_fills_capacity() {
        let temp_dir = TempDir::new().unwrap();

        let mut utf8 = open(
            BlockConfig::new(5).fixed_length().with_fill_char('-'),
            &temp_dir,
            "utf8",
        );
        utf8.write("xyz", 0).unwrap();
        utf8.clear(3).unwrap();
        assert_eq!(utf8.read(5, 0).unwrap(), "-----");
        utf8.close().unwrap();

        let mut latin1 = open(
            BlockConfig::new(5)
                .fixed_length()
                .with_encoding(TextEncoding::Latin1)
                .with_fill_char('ÿ'),
            &temp_dir,
            "latin1",
        );
        latin1.clear(0).unwrap();
        assert_eq!(latin1.read(5, 0).unwrap(), "ÿÿÿÿÿ");
        latin1.close().unwrap();
    }

    #[test]
    fn test_capacity_violation_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let config = BlockConfig::new(8)
            .fixed_length()
            .with_encoding(TextEncoding::Ascii)
            .with_fill_char('#');
        let mut block = open(config, &temp_dir, "bounded");
        block.clear(0).unwrap();

        let err = block.write("toolong-value", 0).unwrap_err();
        assert!(matches!(err, ShmError::Capacity { offset: 0, end: 13, limit: 8 }));
        assert_eq!(block.read(8, 0).unwrap(), "########");

        let err = block.write("abc", 6).unwrap_err();
        assert!(err.is_capacity());
        assert_eq!(block.read(8, 0).unwrap(), "########");

        block.write("abc", 5).unwrap();
        assert_eq!(block.read(8, 0).unwrap(), "#####abc");
        block.close().unwrap();
    }

    #[test]
    fn test_capacity_is_per_slot_under_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let mut block = open(BlockConfig::new(3).fixed_length(), &temp_dir, "utf8-bound");
        block.clear(0).unwrap();
        let err = block.write("toolong-value", 0).unwrap_err();
        assert!(matches!(err, ShmError::Capacity { limit: 12, .. }));
        assert_eq!(block.read(3, 0).unwrap(), "   ");
        block.close().unwrap();
    }

    #[test]
    fn test_terminated_region_end() {
        let temp_dir = TempDir::new().unwrap();
        let mut block = open(BlockConfig::new(6), &temp_dir, "short");
        block.write("keep", 0).unwrap();
        assert!(block.write("sixsix", 0).unwrap_err().is_capacity());
        assert_eq!(block.read(0, 0).unwrap(), "keep");
        block.close().unwrap();
    }

    #[test]
    fn test_serialized_round_trip_terminated() {
        let temp_dir = TempDir::new().unwrap();
        let mut block = open(BlockConfig::new(256).with_serialize(true), &temp_dir, "json");

        block.write_value(&gpio(), 0).unwrap();
        assert_eq!(block.read_value::<GpioDescriptor>(0, 0).unwrap(), Some(gpio()));

        let tuple = ("/org/openbmc/sensors/temp".to_string(), true, false);
        block.write_value(&tuple, 0).unwrap();
        assert_eq!(
            block.read_value::<(String, bool, bool)>(0, 0).unwrap(),
            Some(tuple)
        );
        block.close().unwrap();
    }

    #[test]
    fn test_serialized_round_trip_fixed_length_bincode() {
        let temp_dir = TempDir::new().unwrap();
        let config = BlockConfig::new(64)
            .fixed_length()
            .with_format(SerialFormat::Bincode);
        let mut block = open(config, &temp_dir, "bincode");
        block.clear(0).unwrap();

        block.write_value(&gpio(), 0).unwrap();
        assert_eq!(block.read_value::<GpioDescriptor>(64, 0).unwrap(), Some(gpio()));
        block.close().unwrap();
    }

    #[test]
    fn test_fixed_length_json_scalars_and_structs() {
        let temp_dir = TempDir::new().unwrap();

        // Zero-grown backing file
        let mut grown = open(
            BlockConfig::new(4).fixed_length().with_serialize(true),
            &temp_dir,
            "json-grown",
        );
        grown.write_value(&7u32, 0).unwrap();
        assert_eq!(grown.read_value::<u32>(4, 0).unwrap(), Some(7));
        grown.write_value(&true, 0).unwrap();
        assert_eq!(grown.read_value::<bool>(4, 0).unwrap(), Some(true));
        grown.close().unwrap();

        // Backing file seeded with the default value
        let mut seeded = SharedMemoryBlock::new(BlockConfig::new(8).fixed_length().with_serialize(true)).unwrap();
        seeded
            .create(temp_dir.path(), "/org/openbmc/test", "json-seeded", "00000000")
            .unwrap();
        seeded.write_value(&9u32, 0).unwrap();
        assert_eq!(seeded.read_value::<u32>(8, 0).unwrap(), Some(9));
        seeded.write_value(&false, 0).unwrap();
        assert_eq!(seeded.read_value::<bool>(8, 0).unwrap(), Some(false));
        seeded.close().unwrap();

        // Shorter values over longer stale content
        let mut reused = open(
            BlockConfig::new(32).fixed_length().with_serialize(true),
            &temp_dir,
            "json-reused",
        );
        reused.clear(0).unwrap();
        reused.write_value(&1234u32, 0).unwrap();
        reused.write_value(&5u32, 0).unwrap();
        assert_eq!(reused.read_value::<u32>(32, 0).unwrap(), Some(5));

        reused.write_value(&gpio(), 0).unwrap();
        reused.write_value(&-1i64, 0).unwrap();
        assert_eq!(reused.read_value::<i64>(32, 0).unwrap(), Some(-1));

        reused.write_value(&gpio(), 0).unwrap();
        assert_eq!(reused.read_value::<GpioDescriptor>(32, 0).unwrap(), Some(gpio()));
        reused.close().unwrap();
    }

    #[test]
    fn test_two_handles_share_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let config = BlockConfig::new(32).with_label("channel");
        let mut writer = open(config.clone(), &temp_dir, "channel");
        let reader = open(config, &temp_dir, "channel");

        writer.write("request:42", 0).unwrap();
        assert_eq!(reader.read(0, 0).unwrap(), "request:42");

        writer.write("ok", 0).unwrap();
        assert_eq!(reader.read(0, 0).unwrap(), "ok");

        let mut reader = reader;
        reader.close().unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_create_keeps_existing_content() {
        let temp_dir = TempDir::new().unwrap();

        let mut first = SharedMemoryBlock::new(BlockConfig::new(4)).unwrap();
        first.create(temp_dir.path(), "seg", "value", "00000000").unwrap();
        assert_eq!(first.read(0, 0).unwrap(), "00000000");
        first.write("abc", 0).unwrap();
        first.flush().unwrap();
        first.close().unwrap();

        let mut second = SharedMemoryBlock::new(BlockConfig::new(4)).unwrap();
        second.create(temp_dir.path(), "seg", "value", "zzzzzzzz").unwrap();
        assert_eq!(second.read(0, 0).unwrap(), "abc");
        assert_eq!(second.path(), Some(temp_dir.path().join("seg/value").as_path()));
        second.close().unwrap();
    }

    #[test]
    fn test_decode_errors_are_distinct() {
        let temp_dir = TempDir::new().unwrap();

        let mut latin1 = open(
            BlockConfig::new(16).with_encoding(TextEncoding::Latin1),
            &temp_dir,
            "mixed",
        );
        latin1.write("café", 0).unwrap();

        let utf8 = open(BlockConfig::new(16), &temp_dir, "mixed");
        assert!(matches!(utf8.read(0, 0), Err(ShmError::Encoding { .. })));

        let json = open(BlockConfig::new(16).with_serialize(true), &temp_dir, "mixed");
        latin1.write("{broken", 0).unwrap();
        assert!(matches!(
            json.read_value::<GpioDescriptor>(0, 0),
            Err(ShmError::Decode { .. })
        ));

        for mut block in [latin1, utf8, json] {
            block.close().unwrap();
        }
    }

    #[test]
    fn test_lossy_text_encoding() {
        let temp_dir = TempDir::new().unwrap();
        let mut block = open(
            BlockConfig::new(16).with_encoding(TextEncoding::Ascii),
            &temp_dir,
            "ascii",
        );
        block.write("naïve ☃", 0).unwrap();
        assert_eq!(block.read(0, 0).unwrap(), "na?ve ?");
        block.close().unwrap();
    }

    #[test]
    fn test_creation_errors() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("not-a-dir"), b"x").unwrap();

        let mut block = SharedMemoryBlock::new(BlockConfig::new(4)).unwrap();
        let err = block
            .create(temp_dir.path(), "not-a-dir", "value", "0000")
            .unwrap_err();
        assert!(matches!(err, ShmError::Creation { .. }));
        assert_eq!(block.state(), BlockState::Unbound);

        // A failed create leaves the block usable
        block.create(temp_dir.path(), "ok", "value", "0000").unwrap();
        assert!(block.is_bound());
        block.close().unwrap();
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        assert!(matches!(
            SharedMemoryBlock::new(BlockConfig::new(0)),
            Err(ShmError::InvalidParameter { .. })
        ));
        assert!(matches!(
            SharedMemoryBlock::new(BlockConfig::new(4).with_fill_char('€')),
            Err(ShmError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_drop_without_close_releases_mapping() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut block = open(BlockConfig::new(8), &temp_dir, "dropped");
            block.write("bye", 0).unwrap();
        }
        let mut block = open(BlockConfig::new(8), &temp_dir, "dropped");
        assert_eq!(block.read(0, 0).unwrap(), "bye");
        block.close().unwrap();
    }
}
