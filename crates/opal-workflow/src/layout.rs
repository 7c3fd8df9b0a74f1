//! The fixed partition topology of an Opal device.
//!
//! Every conformant device carries exactly eight partitions: the EFI
//! system partition, per-slot EFI and rootfs and var partitions, and a
//! shared home. The table below is the single source of truth for
//! indices, names, sizes, and GPT type GUIDs.

use std::fmt;
use std::path::{Path, PathBuf};

/// One of the two redundant, independently bootable OS copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// Imaging and finalization order: A is always handled first.
    pub const BOTH: [Slot; 2] = [Slot::A, Slot::B];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::A => "A",
            Slot::B => "B",
        }
    }

    pub fn other(&self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    pub fn efi_index(&self) -> u32 {
        match self {
            Slot::A => 2,
            Slot::B => 3,
        }
    }

    pub fn rootfs_index(&self) -> u32 {
        match self {
            Slot::A => 4,
            Slot::B => 5,
        }
    }

    pub fn var_index(&self) -> u32 {
        match self {
            Slot::A => 6,
            Slot::B => 7,
        }
    }

    pub fn efi_label(&self) -> &'static str {
        match self {
            Slot::A => "efi-A",
            Slot::B => "efi-B",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The physical device a repair run acts on. Resolved once at startup
/// and threaded through every component; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskTarget {
    disk: PathBuf,
    infix: &'static str,
}

impl DiskTarget {
    pub fn new(disk: impl Into<PathBuf>) -> Self {
        let disk = disk.into();
        // nvme/mmcblk/loop devices number partitions with a "p" infix.
        let name = disk.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let infix =
            if name.starts_with("nvme") || name.starts_with("mmcblk") || name.starts_with("loop") {
                "p"
            } else {
                ""
            };
        Self { disk, infix }
    }

    pub fn disk(&self) -> &Path {
        &self.disk
    }

    /// Device path of partition `index` on this disk.
    pub fn partition_device(&self, index: u32) -> PathBuf {
        PathBuf::from(format!("{}{}{}", self.disk.display(), self.infix, index))
    }

    pub fn esp_device(&self) -> PathBuf {
        self.partition_device(ESP_INDEX)
    }

    pub fn efi_device(&self, slot: Slot) -> PathBuf {
        self.partition_device(slot.efi_index())
    }

    pub fn rootfs_device(&self, slot: Slot) -> PathBuf {
        self.partition_device(slot.rootfs_index())
    }

    pub fn var_device(&self, slot: Slot) -> PathBuf {
        self.partition_device(slot.var_index())
    }

    pub fn home_device(&self) -> PathBuf {
        self.partition_device(HOME_INDEX)
    }
}

pub const ESP_INDEX: u32 = 1;
pub const HOME_INDEX: u32 = 8;

pub const ESP_LABEL: &str = "esp";

/// Bumped whenever the partition table below changes shape.
pub const PARTITION_TABLE_VERSION: u32 = 2;

/// One entry of the on-disk partition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSpec {
    /// Physical partition number, contiguous from 1.
    pub index: u32,
    /// GPT partition name.
    pub name: &'static str,
    /// Size in MiB; None means the partition takes the rest of the disk.
    pub size_mib: Option<u64>,
    /// GPT partition type GUID.
    pub type_guid: &'static str,
}

const TYPE_ESP: &str = "C12A7328-F81F-11D2-BA4B-00A0C93EC93B";
const TYPE_LINUX: &str = "0FC63DAF-8483-4772-8E79-3D69D8477DE4";
const TYPE_LINUX_ROOT: &str = "4F68BCE3-E8CD-4DB1-96E7-FBCAF984B709";
const TYPE_LINUX_HOME: &str = "933AC7E1-2EB4-4F13-B844-0E14E2AEF915";

/// The full layout of a conformant device, in physical partition order.
pub const PARTITION_TABLE: [PartitionSpec; 8] = [
    PartitionSpec {
        index: 1,
        name: "esp",
        size_mib: Some(64),
        type_guid: TYPE_ESP,
    },
    PartitionSpec {
        index: 2,
        name: "efi-A",
        size_mib: Some(32),
        type_guid: TYPE_LINUX,
    },
    PartitionSpec {
        index: 3,
        name: "efi-B",
        size_mib: Some(32),
        type_guid: TYPE_LINUX,
    },
    PartitionSpec {
        index: 4,
        name: "rootfs-A",
        size_mib: Some(5120),
        type_guid: TYPE_LINUX_ROOT,
    },
    PartitionSpec {
        index: 5,
        name: "rootfs-B",
        size_mib: Some(5120),
        type_guid: TYPE_LINUX_ROOT,
    },
    PartitionSpec {
        index: 6,
        name: "var-A",
        size_mib: Some(256),
        type_guid: TYPE_LINUX,
    },
    PartitionSpec {
        index: 7,
        name: "var-B",
        size_mib: Some(256),
        type_guid: TYPE_LINUX,
    },
    PartitionSpec {
        index: 8,
        name: "home",
        size_mib: None,
        type_guid: TYPE_LINUX_HOME,
    },
];

/// Expected filesystem type and partition label for a verified partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedPartition {
    pub index: u32,
    pub fstype: &'static str,
    pub label: &'static str,
}

/// Partitions the verification gate knows expected values for. The
/// rootfs slots are absent: a partial OS repair overwrites them
/// wholesale, so there is nothing to protect by pre-checking them.
pub const VERIFIED_PARTITIONS: [ExpectedPartition; 6] = [
    ExpectedPartition {
        index: 1,
        fstype: "vfat",
        label: "esp",
    },
    ExpectedPartition {
        index: 2,
        fstype: "vfat",
        label: "efi-A",
    },
    ExpectedPartition {
        index: 3,
        fstype: "vfat",
        label: "efi-B",
    },
    ExpectedPartition {
        index: 6,
        fstype: "ext4",
        label: "var-A",
    },
    ExpectedPartition {
        index: 7,
        fstype: "ext4",
        label: "var-B",
    },
    ExpectedPartition {
        index: 8,
        fstype: "ext4",
        label: "home",
    },
];

/// Render the partition table as an sfdisk script for `target`.
///
/// The script replaces the whole layout in one pass: a GPT label line
/// followed by one entry per partition. The last entry carries no size
/// and takes the rest of the disk.
pub fn sfdisk_script(target: &DiskTarget) -> String {
    let mut script = String::from("label: gpt\n");
    for spec in &PARTITION_TABLE {
        let device = target.partition_device(spec.index);
        match spec.size_mib {
            Some(size) => script.push_str(&format!(
                "{} : size={}MiB, type={}, name=\"{}\"\n",
                device.display(),
                size,
                spec.type_guid,
                spec.name
            )),
            None => script.push_str(&format!(
                "{} : type={}, name=\"{}\"\n",
                device.display(),
                spec.type_guid,
                spec.name
            )),
        }
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_indices_are_contiguous_from_one() {
        for (pos, spec) in PARTITION_TABLE.iter().enumerate() {
            assert_eq!(spec.index, pos as u32 + 1);
        }
    }

    #[test]
    fn only_the_last_partition_is_sizeless() {
        let (last, rest) = PARTITION_TABLE.split_last().unwrap();
        assert!(last.size_mib.is_none());
        assert!(rest.iter().all(|spec| spec.size_mib.is_some()));
    }

    #[test]
    fn plain_disks_number_partitions_without_infix() {
        let target = DiskTarget::new("/dev/sda");
        assert_eq!(
            target.partition_device(4),
            PathBuf::from("/dev/sda4")
        );
    }

    #[test]
    fn nvme_and_mmc_disks_use_p_infix() {
        let nvme = DiskTarget::new("/dev/nvme0n1");
        assert_eq!(nvme.partition_device(1), PathBuf::from("/dev/nvme0n1p1"));

        let mmc = DiskTarget::new("/dev/mmcblk0");
        assert_eq!(mmc.rootfs_device(Slot::B), PathBuf::from("/dev/mmcblk0p5"));

        let loopdev = DiskTarget::new("/dev/loop3");
        assert_eq!(loopdev.home_device(), PathBuf::from("/dev/loop3p8"));
    }

    #[test]
    fn slot_devices_map_to_table_indices() {
        let target = DiskTarget::new("/dev/sda");
        assert_eq!(target.esp_device(), PathBuf::from("/dev/sda1"));
        assert_eq!(target.efi_device(Slot::A), PathBuf::from("/dev/sda2"));
        assert_eq!(target.efi_device(Slot::B), PathBuf::from("/dev/sda3"));
        assert_eq!(target.rootfs_device(Slot::A), PathBuf::from("/dev/sda4"));
        assert_eq!(target.var_device(Slot::B), PathBuf::from("/dev/sda7"));
        assert_eq!(target.home_device(), PathBuf::from("/dev/sda8"));
    }

    #[test]
    fn sfdisk_script_covers_every_partition() {
        let target = DiskTarget::new("/dev/sda");
        let script = sfdisk_script(&target);

        assert!(script.starts_with("label: gpt\n"));
        assert_eq!(script.lines().count(), 1 + PARTITION_TABLE.len());
        for spec in &PARTITION_TABLE {
            assert!(script.contains(&format!("name=\"{}\"", spec.name)));
        }
        // The home partition takes the rest of the disk.
        let home_line = script.lines().last().unwrap();
        assert!(home_line.contains("/dev/sda8"));
        assert!(!home_line.contains("size="));
    }

    #[test]
    fn verified_partitions_agree_with_the_table() {
        for expected in &VERIFIED_PARTITIONS {
            let spec = PARTITION_TABLE
                .iter()
                .find(|spec| spec.index == expected.index)
                .unwrap();
            assert_eq!(spec.name, expected.label);
        }
    }
}
