mod marks;

pub use marks::SliceMarks;
