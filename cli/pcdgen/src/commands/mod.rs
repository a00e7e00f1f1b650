//! CLI command implementations.

pub mod check;
pub mod generate;
pub mod inspect;

use std::path::Path;

use anyhow::{Context, Result};
use pcd_collect::PlatformDescription;

/// Load and parse the platform description at `path`.
pub fn load_platform(path: &Path) -> Result<PlatformDescription> {
    log::info!("loading platform description {}", path.display());
    PlatformDescription::load(path).with_context(|| format!("loading {}", path.display()))
}

/// Two-phase platform shared by the command tests.
#[cfg(test)]
pub(crate) const TEST_PLATFORM: &str = r#"
name = "Nt32"

[[modules]]
name = "PcdPeim"
arch = "IA32"
module-type = "PEIM"

[[modules.pcds]]
cname = "PcdMaxPeiPerformanceLogEntries"
token-space-guid = "8be4df61-93ca-11d2-aa0d-00e098032b8c"
item-type = "DYNAMIC"
datum-type = "UINT8"
token = "0x0001"
max-datum-size = 1

[[modules.pcds]]
cname = "PcdFoo"
token-space-guid = "8be4df61-93ca-11d2-aa0d-00e098032b8c"
item-type = "FIXED_AT_BUILD"
datum-type = "UINT32"
token = "0x0002"
max-datum-size = 4
value = "0x10"

[[modules]]
name = "PcdDxe"
arch = "X64"
module-type = "DXE_DRIVER"

[[modules.pcds]]
cname = "PcdPlatformLang"
token-space-guid = "8be4df61-93ca-11d2-aa0d-00e098032b8c"
item-type = "DYNAMIC_EX"
datum-type = "VOID*"
token = "0x0003"
max-datum-size = 16

[[dynamic-pcds]]
cname = "PcdMaxPeiPerformanceLogEntries"
token-space-guid = "8be4df61-93ca-11d2-aa0d-00e098032b8c"
max-datum-size = 1

[[dynamic-pcds.sku-info]]
sku-id = 0
value = "28"

[[dynamic-pcds]]
cname = "PcdPlatformLang"
token-space-guid = "8be4df61-93ca-11d2-aa0d-00e098032b8c"
max-datum-size = 16

[[dynamic-pcds.sku-info]]
sku-id = 0
value = 'L"en-US"'
"#;
