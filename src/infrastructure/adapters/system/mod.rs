//! System Adapter - 宿主机信息

mod disk_space;

pub use disk_space::SysinfoDiskSpace;
